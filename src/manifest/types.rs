//! Scalar types shared by the manifest catalog.

use crate::fieldpath::Path;
use crate::merge::{Merge, MergeError};
use crate::union::IsZero;
use crate::validate::format::{self, Protocol};
use crate::validate::{Validate, ValidationErrors};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// HumanDuration is a duration authored as `30s`, `1m30s` or `2h`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_secs(secs: u64) -> Self {
        HumanDuration(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        HumanDuration(d)
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw)
            .map(HumanDuration)
            .map_err(|e| D::Error::custom(format!("invalid duration \"{}\": {}", raw, e)))
    }
}

impl IsZero for HumanDuration {
    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Merge for HumanDuration {
    fn merge_at(&mut self, overlay: Self, _path: &Path) -> Result<(), MergeError> {
        *self = overlay;
        Ok(())
    }
}

impl Validate for HumanDuration {
    fn validate_at(&self, _path: &Path, _errors: &mut ValidationErrors) {}
}

/// Returns the std duration inside an optional human duration.
pub(crate) fn std_duration(d: &Option<HumanDuration>) -> Option<Duration> {
    d.as_ref().map(HumanDuration::as_duration)
}

/// PortMapping is a container port authored as `80` or `"80/tcp"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PortMapping(String);

impl PortMapping {
    pub fn new(s: impl Into<String>) -> Self {
        PortMapping(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the mapping into port number and protocol.
    pub fn parse(&self) -> Result<(u16, Protocol), String> {
        format::parse_port(&self.0)
    }
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => PortMapping(n.to_string()),
            Raw::Text(s) => PortMapping(s),
        })
    }
}

impl IsZero for PortMapping {
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl Merge for PortMapping {
    fn merge_at(&mut self, overlay: Self, _path: &Path) -> Result<(), MergeError> {
        *self = overlay;
        Ok(())
    }
}

impl Validate for PortMapping {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        format::port(path, &self.0, errors);
    }
}
