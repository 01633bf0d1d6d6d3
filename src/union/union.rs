//! The basic/advanced union container.

use super::decode::attempt;
use super::error::DecodeError;
use super::zero::IsZero;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value as Raw;

/// Union holds at most one of two alternative shapes of the same setting.
///
/// `Basic` is the short form (a scalar or a list), `Advanced` the fully
/// specified structure. `Unset` is distinct from either side holding its zero
/// value. Which side is populated is decided once, when the document is
/// decoded; readers never re-resolve it.
#[derive(Debug, Clone, PartialEq)]
pub enum Union<B, A> {
    /// Neither shape was authored.
    Unset,
    /// The short form.
    Basic(B),
    /// The fully specified form.
    Advanced(A),
}

impl<B, A> Default for Union<B, A> {
    fn default() -> Self {
        Union::Unset
    }
}

impl<B, A> Union<B, A> {
    /// Creates a union holding the basic shape.
    pub fn from_basic(basic: B) -> Self {
        Union::Basic(basic)
    }

    /// Creates a union holding the advanced shape.
    pub fn from_advanced(advanced: A) -> Self {
        Union::Advanced(advanced)
    }

    /// Returns true if neither shape is populated.
    pub fn is_unset(&self) -> bool {
        matches!(self, Union::Unset)
    }

    /// Returns true if the basic shape is populated.
    pub fn is_basic(&self) -> bool {
        matches!(self, Union::Basic(_))
    }

    /// Returns true if the advanced shape is populated.
    pub fn is_advanced(&self) -> bool {
        matches!(self, Union::Advanced(_))
    }

    /// Returns the basic value, if that is the populated shape.
    pub fn basic(&self) -> Option<&B> {
        match self {
            Union::Basic(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the advanced value, if that is the populated shape.
    pub fn advanced(&self) -> Option<&A> {
        match self {
            Union::Advanced(a) => Some(a),
            _ => None,
        }
    }

    /// Converts from `&Union<B, A>` to `Union<&B, &A>`.
    pub fn as_ref(&self) -> Union<&B, &A> {
        match self {
            Union::Unset => Union::Unset,
            Union::Basic(b) => Union::Basic(b),
            Union::Advanced(a) => Union::Advanced(a),
        }
    }

    /// Replaces the content with the basic shape, dropping any advanced value.
    pub fn set_basic(&mut self, basic: B) {
        *self = Union::Basic(basic);
    }

    /// Replaces the content with the advanced shape, dropping any basic value.
    pub fn set_advanced(&mut self, advanced: A) {
        *self = Union::Advanced(advanced);
    }

    /// Resets to unset.
    pub fn clear(&mut self) {
        *self = Union::Unset;
    }

    /// Returns the advanced value, or the advanced type's default when the
    /// union is unset or holds the basic shape.
    pub fn advanced_or_default(&self) -> A
    where
        A: Clone + Default,
    {
        self.advanced().cloned().unwrap_or_default()
    }
}

impl<B, A> Union<B, A>
where
    B: DeserializeOwned + IsZero,
    A: DeserializeOwned + IsZero,
{
    /// Decodes a raw YAML node into whichever shape it was authored as.
    ///
    /// - null resolves to [`Union::Unset`];
    /// - a scalar or sequence is tried as `B`, then as `A`; the first shape
    ///   that decodes wins, even when it decodes to a zero value;
    /// - a mapping is tried as `A`, then as `B`; a shape wins only if it
    ///   decodes to a non-zero value. An empty mapping resolves to
    ///   [`Union::Unset`]; a non-empty mapping that neither shape can hold is
    ///   an error naming both shapes.
    pub fn decode(raw: Raw) -> Result<Self, DecodeError> {
        match raw {
            Raw::Null => Ok(Union::Unset),
            Raw::Tagged(tagged) => Self::decode(tagged.value),
            Raw::Mapping(ref mapping) => {
                let advanced = attempt::<A>(raw.clone());
                let advanced_error = match advanced {
                    Ok(a) if !a.is_zero() => return Ok(Union::Advanced(a)),
                    Ok(_) => "decoded to an empty value".to_string(),
                    Err(e) => e,
                };

                let basic = attempt::<B>(raw.clone());
                let basic_error = match basic {
                    Ok(b) if !b.is_zero() => return Ok(Union::Basic(b)),
                    Ok(_) => "decoded to an empty value".to_string(),
                    Err(e) => e,
                };

                if mapping.is_empty() {
                    return Ok(Union::Unset);
                }
                Err(DecodeError::ambiguous::<B, A>(
                    "mapping",
                    basic_error,
                    advanced_error,
                ))
            }
            other => {
                let shape = if other.is_sequence() {
                    "sequence"
                } else {
                    "scalar"
                };
                let basic_error = match attempt::<B>(other.clone()) {
                    Ok(b) => return Ok(Union::Basic(b)),
                    Err(e) => e,
                };
                let advanced_error = match attempt::<A>(other) {
                    Ok(a) => return Ok(Union::Advanced(a)),
                    Err(e) => e,
                };
                Err(DecodeError::ambiguous::<B, A>(
                    shape,
                    basic_error,
                    advanced_error,
                ))
            }
        }
    }
}

impl<B, A> IsZero for Union<B, A> {
    fn is_zero(&self) -> bool {
        self.is_unset()
    }
}

impl<B, A> From<B> for Union<B, A> {
    fn from(basic: B) -> Self {
        Union::Basic(basic)
    }
}

impl<'de, B, A> Deserialize<'de> for Union<B, A>
where
    B: DeserializeOwned + IsZero,
    A: DeserializeOwned + IsZero,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Buffering through a raw node lets an inlined (flattened) union see
        // the parent's leftover keys as a plain mapping.
        let raw = Raw::deserialize(deserializer)?;
        Union::decode(raw).map_err(D::Error::custom)
    }
}

impl<B, A> Serialize for Union<B, A>
where
    B: Serialize,
    A: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Union::Unset => serializer.serialize_none(),
            Union::Basic(b) => b.serialize(serializer),
            Union::Advanced(a) => a.serialize(serializer),
        }
    }
}

/// Union of a single string and a list of strings, used for commands,
/// entrypoints and aliases.
pub type StringOrStringSlice = Union<String, Vec<String>>;

impl StringOrStringSlice {
    /// Returns the authored value as a list, splitting nothing: a basic string
    /// becomes a one-element list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Union::Unset => Vec::new(),
            Union::Basic(s) => vec![s.clone()],
            Union::Advanced(v) => v.clone(),
        }
    }
}
