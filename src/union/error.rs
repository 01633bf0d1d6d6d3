//! Decode errors.

use thiserror::Error;

/// DecodeError represents a failure to turn a document into a config tree.
///
/// Decoding is all-or-nothing: no partially decoded tree is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A union field matched neither of its shapes.
    #[error("cannot decode {shape} as either {basic} ({basic_error}) or {advanced} ({advanced_error})")]
    Ambiguity {
        shape: &'static str,
        basic: String,
        advanced: String,
        basic_error: String,
        advanced_error: String,
    },

    /// The document failed to decode at the given field path.
    #[error("{path}: {message}")]
    Document { path: String, message: String },

    /// The document is not well-formed YAML.
    #[error("malformed YAML: {0}")]
    Syntax(String),
}

impl DecodeError {
    /// Creates an ambiguity error naming both attempted shapes.
    pub fn ambiguous<B, A>(
        shape: &'static str,
        basic_error: impl Into<String>,
        advanced_error: impl Into<String>,
    ) -> Self {
        DecodeError::Ambiguity {
            shape,
            basic: short_type_name(std::any::type_name::<B>()),
            advanced: short_type_name(std::any::type_name::<A>()),
            basic_error: basic_error.into(),
            advanced_error: advanced_error.into(),
        }
    }

    /// Creates a document error at the given path.
    pub fn document(path: impl Into<String>, message: impl Into<String>) -> Self {
        DecodeError::Document {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Strips module paths from a type name:
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        if !(c.is_alphanumeric() || c == '_') {
            out.push(c);
            segment_start = out.len();
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(
            short_type_name("alloc::vec::Vec<alloc::string::String>"),
            "Vec<String>"
        );
        assert_eq!(short_type_name("u32"), "u32");
        assert_eq!(
            short_type_name("core::option::Option<workload_manifest::manifest::Range>"),
            "Option<Range>"
        );
    }

    #[test]
    fn test_ambiguity_display_names_both_shapes() {
        let err = DecodeError::ambiguous::<u32, Vec<String>>("mapping", "bad int", "bad list");
        let msg = err.to_string();
        assert!(msg.contains("u32"));
        assert!(msg.contains("Vec<String>"));
        assert!(msg.contains("mapping"));
    }
}
