//! Union module - Fields that may be authored in a basic or an advanced shape.
//!
//! A health check can be a path string or a threshold object, an image can be
//! a registry location or a build specification, a task count can be a number
//! or an autoscaling policy. [`Union`] carries whichever shape was written.

mod decode;
mod error;
#[allow(clippy::module_inception)]
mod union;
mod zero;

#[cfg(test)]
mod union_test;

pub(crate) use decode::{decode_at, inline};
pub use error::*;
pub use union::*;
pub use zero::*;
