//! Merge errors.

use crate::fieldpath::Path;
use thiserror::Error;

/// MergeError represents a failure to apply an override.
///
/// A merge only fails when an override authors both sides of a registered
/// exclusive pair; the engine never silently picks a winner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("{path}: must specify one, not both, of {first} and {second}")]
    ExclusiveFieldConflict {
        path: Path,
        first: String,
        second: String,
    },
}

impl MergeError {
    /// Creates an exclusive field conflict error.
    pub fn exclusive_conflict(path: Path, first: impl Into<String>, second: impl Into<String>) -> Self {
        MergeError::ExclusiveFieldConflict {
            path,
            first: first.into(),
            second: second.into(),
        }
    }

    /// Returns the path of the override node that caused the error.
    pub fn path(&self) -> &Path {
        match self {
            MergeError::ExclusiveFieldConflict { path, .. } => path,
        }
    }

    /// Returns a remediation hint for the author of the override.
    pub fn hint(&self) -> Option<String> {
        match self {
            MergeError::ExclusiveFieldConflict { first, second, .. } => Some(format!(
                "remove either {} or {} from the environment override",
                first, second
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_error_display() {
        let err = MergeError::exclusive_conflict(Path::from_dotted("image"), "\"build\"", "\"location\"");
        assert_eq!(
            err.to_string(),
            "image: must specify one, not both, of \"build\" and \"location\""
        );
        assert_eq!(err.path(), &Path::from_dotted("image"));
        assert!(err.hint().unwrap().contains("environment override"));
    }
}
