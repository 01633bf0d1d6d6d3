//! The Validate trait and reusable checks.

use super::{ValidationError, ValidationErrors};
use crate::fieldpath::Path;
use crate::union::Union;
use std::collections::BTreeMap;
use std::time::Duration;

/// Validate walks a resolved tree depth-first and records every violated
/// invariant. All errors are collected; nothing stops at the first one.
pub trait Validate {
    /// Checks `self`, located at `path`, and its children.
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors);

    /// Checks the whole tree rooted at `self`.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.validate_at(&Path::new(), &mut errors);
        tracing::debug!(errors = errors.len(), "validated config tree");
        errors.into_result()
    }
}

macro_rules! leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Validate for $ty {
                fn validate_at(&self, _path: &Path, _errors: &mut ValidationErrors) {}
            }
        )*
    };
}

leaf!(String, bool, u8, u16, u32, u64, i32, i64, usize, f64, Duration);

impl<T: Validate> Validate for Option<T> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(value) = self {
            value.validate_at(path, errors);
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        for (i, item) in self.iter().enumerate() {
            item.validate_at(&path.index(i), errors);
        }
    }
}

impl<V: Validate> Validate for BTreeMap<String, V> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        for (key, value) in self {
            value.validate_at(&path.key(key), errors);
        }
    }
}

impl<B: Validate, A: Validate> Validate for Union<B, A> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        match self {
            Union::Unset => {}
            Union::Basic(b) => b.validate_at(path, errors),
            Union::Advanced(a) => a.validate_at(path, errors),
        }
    }
}

/// Records a missing `field` when `trigger` is set and `field` is not.
pub fn require_if(
    path: &Path,
    trigger: (&str, bool),
    field: (&str, bool),
    errors: &mut ValidationErrors,
) {
    if trigger.1 && !field.1 {
        errors.add(ValidationError::missing_conditional(path.clone(), field.0, trigger.0));
    }
}

/// Records an error unless at least one of the named fields is set.
pub fn require_one_of(path: &Path, fields: &[(&str, bool)], errors: &mut ValidationErrors) {
    if fields.iter().any(|(_, set)| *set) {
        return;
    }
    let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    errors.add(ValidationError::missing_one_of(path.clone(), &names));
}

/// Records an error if a field is absent.
pub fn require(path: &Path, field: &str, set: bool, errors: &mut ValidationErrors) {
    if !set {
        errors.add(ValidationError::missing_field(path.clone(), field));
    }
}

/// Records an error if `min > max`.
pub fn min_le_max<T: PartialOrd + std::fmt::Display>(
    path: &Path,
    min: (&str, T),
    max: (&str, T),
    errors: &mut ValidationErrors,
) {
    if min.1 > max.1 {
        errors.add(ValidationError::invalid_range(
            path.clone(),
            format!(
                "\"{}\" ({}) must be less than or equal to \"{}\" ({})",
                min.0, min.1, max.0, max.1
            ),
        ));
    }
}

/// Records an error if `value` falls outside `[lo, hi]`.
pub fn within<T: PartialOrd + std::fmt::Display>(
    path: &Path,
    value: T,
    lo: T,
    hi: T,
    errors: &mut ValidationErrors,
) {
    if value < lo || value > hi {
        errors.add(
            ValidationError::invalid_range(
                path.clone(),
                format!("value {} must be between {} and {}", value, lo, hi),
            )
            .with_hint(format!("pick a value from {} to {}", lo, hi)),
        );
    }
}

/// Records an error if a percentage falls outside `[0, 100]`.
pub fn percentage(path: &Path, value: u32, errors: &mut ValidationErrors) {
    within(path, value, 0, 100, errors);
}

/// Records an error for a zero duration where only a positive one makes sense.
pub fn positive_duration(path: &Path, value: Option<Duration>, errors: &mut ValidationErrors) {
    if value.is_some_and(|d| d.is_zero()) {
        errors.add(
            ValidationError::invalid_range(path.clone(), "duration must be greater than 0s")
                .with_hint("use a positive duration such as \"10s\""),
        );
    }
}

/// Records an error if a duration falls outside `[lo, hi]`.
pub fn duration_within(
    path: &Path,
    value: Option<Duration>,
    lo: Duration,
    hi: Duration,
    errors: &mut ValidationErrors,
) {
    let Some(value) = value else {
        return;
    };
    if value < lo || value > hi {
        errors.add(ValidationError::invalid_range(
            path.clone(),
            format!(
                "duration {} must be between {} and {}",
                humantime::format_duration(value),
                humantime::format_duration(lo),
                humantime::format_duration(hi)
            ),
        ));
    }
}
