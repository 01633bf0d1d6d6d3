//! Path-tracking decode helpers.
//!
//! Inlined (`#[serde(flatten)]`) structs and unions are decoded from a
//! buffered node, which hides the failing field from the outer deserializer.
//! These helpers track the path on each buffered decode and report it.

use super::error::DecodeError;
use crate::fieldpath::Path;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Decodes `value` as `T`. A failure is reported at `base` joined with the
/// path of the field that failed inside `value`.
pub(crate) fn decode_at<T: DeserializeOwned>(value: Value, base: &Path) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = join(base, err.path());
        DecodeError::document(path, err.into_inner().to_string())
    })
}

/// Decodes one shape of a union, prefixing the message with the failing
/// field inside the shape.
pub(crate) fn attempt<T: DeserializeOwned>(raw: Value) -> Result<T, String> {
    serde_path_to_error::deserialize(raw).map_err(|err| located(err.path(), err.inner()))
}

/// Deserializes a `#[serde(flatten)]` field, naming the failing key in the
/// error message.
pub(crate) fn inline<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        if err.path().iter().next().is_none() {
            err.into_inner()
        } else {
            D::Error::custom(located(err.path(), err.inner()))
        }
    })
}

fn located(path: &serde_path_to_error::Path, message: &impl std::fmt::Display) -> String {
    if path.iter().next().is_none() {
        message.to_string()
    } else {
        format!("{}: {}", path, message)
    }
}

fn join(base: &Path, inner: &serde_path_to_error::Path) -> String {
    let inner = inner.to_string();
    if base.is_empty() {
        inner
    } else if inner == "." {
        base.to_string()
    } else if inner.starts_with('[') {
        format!("{}{}", base, inner)
    } else {
        format!("{}.{}", base, inner)
    }
}
