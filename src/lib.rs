//! # Workload Manifest
//!
//! Typed workload manifests with per-environment overrides.
//!
//! A manifest describes a service or job once and carries sparse override
//! fragments per environment. Loading one resolves the chosen environment by
//! merging its fragment over the base and validates the result.
//!
//! ## Modules
//!
//! - [`fieldpath`] - Paths locating nodes in a config tree, used in every error
//! - [`union`] - Fields authored in either a basic or an advanced shape
//! - [`exclusive`] - Registry of mutually exclusive field groups
//! - [`merge`] - Environment override merge engine
//! - [`validate`] - Invariant checks over a resolved tree
//! - [`manifest`] - The workload and environment config catalog
//! - [`interpolate`] - `${NAME}` substitution in raw documents
//! - [`loader`] - The interpolate, decode, resolve and validate pipeline

pub mod exclusive;
pub mod fieldpath;
pub mod interpolate;
pub mod loader;
pub mod manifest;
pub mod merge;
pub mod union;
pub mod validate;

pub use fieldpath::{Path, PathElement};
pub use loader::{Error, Loader, LoaderBuilder};
pub use manifest::Manifest;
pub use merge::{merge, Merge, MergeError};
pub use union::{DecodeError, IsZero, Union};
pub use validate::{Validate, ValidationError, ValidationErrors};
