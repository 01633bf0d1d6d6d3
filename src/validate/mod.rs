//! Validate module - Invariant checks over a resolved config tree.
//!
//! Checks cover mutual exclusivity (from the exclusive registry), fields
//! required by other fields, at-least-one-of groups, numeric and duration
//! ranges, scalar formats, and consistency between sibling nodes.

pub mod format;
#[allow(clippy::module_inception)]
mod validate;
mod validation;

pub use validate::*;
pub use validation::*;
