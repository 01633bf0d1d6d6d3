//! Field path module - Locates nodes in a config tree.
//!
//! Paths are built while walking a tree and carried by every merge and
//! validation error.

mod path;

pub use path::*;
