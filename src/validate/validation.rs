//! Validation errors.

use crate::fieldpath::Path;
use std::fmt;
use thiserror::Error;

/// ValidationError represents one invariant violated by a resolved tree.
///
/// Every variant carries the path of the offending node. [`hint`] returns a
/// remediation string distinct from the cause rendered by `Display`.
///
/// [`hint`]: ValidationError::hint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{path}: must specify one, not both, of {first} and {second}")]
    ExclusiveFieldConflict {
        path: Path,
        first: String,
        second: String,
    },

    #[error("{path}: \"{field}\" must be specified if \"{trigger}\" is specified")]
    MissingConditionalField {
        path: Path,
        field: String,
        trigger: String,
    },

    #[error("{path}: must specify {fields}")]
    MissingRequiredField { path: Path, fields: String },

    #[error("{path}: {message}")]
    InvalidRange {
        path: Path,
        message: String,
        hint: Option<String>,
    },

    #[error("{path}: {message}")]
    InvalidFormat {
        path: Path,
        message: String,
        hint: Option<String>,
    },

    #[error("{path}: {message}")]
    InconsistentFields {
        path: Path,
        message: String,
        hint: Option<String>,
    },
}

impl ValidationError {
    /// Creates an exclusive field conflict error.
    pub fn exclusive_conflict(path: Path, first: impl Into<String>, second: impl Into<String>) -> Self {
        ValidationError::ExclusiveFieldConflict {
            path,
            first: first.into(),
            second: second.into(),
        }
    }

    /// Creates an error for `field` missing while `trigger` is set.
    pub fn missing_conditional(path: Path, field: impl Into<String>, trigger: impl Into<String>) -> Self {
        ValidationError::MissingConditionalField {
            path,
            field: field.into(),
            trigger: trigger.into(),
        }
    }

    /// Creates an error for a single required field.
    pub fn missing_field(path: Path, field: &str) -> Self {
        ValidationError::MissingRequiredField {
            path,
            fields: format!("\"{}\"", field),
        }
    }

    /// Creates an error requiring at least one of `fields`.
    pub fn missing_one_of(path: Path, fields: &[&str]) -> Self {
        let quoted: Vec<String> = fields.iter().map(|f| format!("\"{}\"", f)).collect();
        ValidationError::MissingRequiredField {
            path,
            fields: format!("at least one of {}", quoted.join(", ")),
        }
    }

    /// Creates an invalid range error.
    pub fn invalid_range(path: Path, message: impl Into<String>) -> Self {
        ValidationError::InvalidRange {
            path,
            message: message.into(),
            hint: None,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(path: Path, message: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            path,
            message: message.into(),
            hint: None,
        }
    }

    /// Creates an error for sibling nodes that disagree with each other.
    pub fn inconsistent(path: Path, message: impl Into<String>) -> Self {
        ValidationError::InconsistentFields {
            path,
            message: message.into(),
            hint: None,
        }
    }

    /// Attaches a remediation hint. Only the range, format and consistency
    /// errors store one; the others derive theirs.
    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            ValidationError::InvalidRange { hint, .. }
            | ValidationError::InvalidFormat { hint, .. }
            | ValidationError::InconsistentFields { hint, .. } => *hint = Some(text.into()),
            _ => {}
        }
        self
    }

    /// Returns the path of the offending node.
    pub fn path(&self) -> &Path {
        match self {
            ValidationError::ExclusiveFieldConflict { path, .. }
            | ValidationError::MissingConditionalField { path, .. }
            | ValidationError::MissingRequiredField { path, .. }
            | ValidationError::InvalidRange { path, .. }
            | ValidationError::InvalidFormat { path, .. }
            | ValidationError::InconsistentFields { path, .. } => path,
        }
    }

    /// Returns a remediation hint, if one is known.
    pub fn hint(&self) -> Option<String> {
        match self {
            ValidationError::ExclusiveFieldConflict { first, second, .. } => {
                Some(format!("remove either {} or {}", first, second))
            }
            ValidationError::MissingConditionalField { field, trigger, .. } => Some(format!(
                "add \"{}\" or remove \"{}\"",
                field, trigger
            )),
            ValidationError::MissingRequiredField { .. } => None,
            ValidationError::InvalidRange { hint, .. }
            | ValidationError::InvalidFormat { hint, .. }
            | ValidationError::InconsistentFields { hint, .. } => hint.clone(),
        }
    }
}

/// ValidationErrors is a collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates a new empty ValidationErrors.
    pub fn new() -> Self {
        ValidationErrors { errors: Vec::new() }
    }

    /// Adds an error.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Extends with another ValidationErrors.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Returns true if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns an iterator over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Returns `Ok(())` when empty, otherwise the collection as an error.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
