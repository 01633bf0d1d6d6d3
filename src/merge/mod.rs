//! Merge module - Environment override merge engine.
//!
//! A base config tree and a sparse override tree of the same type are walked
//! in lockstep. Each composite type implements [`Merge`]: a structural pass
//! over its fields, followed by the exclusive group rules registered for the
//! type. Nested composites run their own rules first, so resolution is
//! depth-first.

mod error;
#[allow(clippy::module_inception)]
mod merge;

#[cfg(test)]
mod merge_test;

pub use error::*;
pub use merge::*;
