//! Exclusive module - Declarative table of mutually exclusive field groups.
//!
//! A composite type registers pairs such as `{build}` vs `{location}`. The
//! merge engine consults the table to clear the side an override did not
//! choose, and the validator consults it to report both sides set.

mod registry;

pub use registry::*;
