//! Manifest module - The workload and environment config catalog.
//!
//! Each workload kind inlines its config next to `name` and carries an
//! `environments` table of override fragments of the same shape.
//! [`Manifest::apply_env`] resolves one environment; [`Validate`] checks the
//! result.

mod count;
mod environment;
mod http;
mod image;
mod network;
mod sidecar;
mod storage;
mod task;
mod types;
mod worker;
mod workload;


pub use count::*;
pub use environment::*;
pub use http::*;
pub use image::*;
pub use network::*;
pub use sidecar::*;
pub use storage::*;
pub use task::*;
pub use types::{HumanDuration, PortMapping};
pub use worker::*;
pub use workload::*;

use crate::exclusive::{ExclusiveGroup, Registry};
use crate::fieldpath::Path;
use crate::merge::MergeError;
use crate::union::{self, DecodeError, IsZero, Union};
use crate::validate::{Validate, ValidationError, ValidationErrors};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Manifest is one document, tagged by its `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Manifest {
    #[serde(rename = "Load Balanced Web Service")]
    LoadBalancedWebService(Workload<LoadBalancedWebServiceConfig>),
    #[serde(rename = "Backend Service")]
    BackendService(Workload<BackendServiceConfig>),
    #[serde(rename = "Worker Service")]
    WorkerService(Workload<WorkerServiceConfig>),
    #[serde(rename = "Scheduled Job")]
    ScheduledJob(Workload<ScheduledJobConfig>),
    #[serde(rename = "Environment")]
    Environment(EnvironmentManifest),
}

/// Accepted values of `type`.
pub const KINDS: &[&str] = &[
    "Load Balanced Web Service",
    "Backend Service",
    "Worker Service",
    "Scheduled Job",
    "Environment",
];

impl Manifest {
    /// Decodes a manifest from YAML. Errors name the field path that failed.
    pub fn from_yaml(s: &str) -> Result<Self, DecodeError> {
        let doc: Value = serde_yaml::from_str(s).map_err(|e| DecodeError::Syntax(e.to_string()))?;
        Manifest::decode(doc)
    }

    /// Decodes a parsed document. The `type` tag is read first so the body
    /// decodes directly into its kind, keeping field paths in errors.
    pub fn decode(doc: Value) -> Result<Self, DecodeError> {
        if !doc.is_mapping() {
            return Err(DecodeError::document(".", "expected a mapping"));
        }
        let kind = match doc.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(DecodeError::document("type", "expected a string")),
            None => return Err(DecodeError::document(".", "missing field `type`")),
        };
        let root = Path::new();
        Ok(match kind.as_str() {
            "Load Balanced Web Service" => {
                Manifest::LoadBalancedWebService(Workload::decode_at(doc, &root)?)
            }
            "Backend Service" => Manifest::BackendService(Workload::decode_at(doc, &root)?),
            "Worker Service" => Manifest::WorkerService(Workload::decode_at(doc, &root)?),
            "Scheduled Job" => Manifest::ScheduledJob(Workload::decode_at(doc, &root)?),
            "Environment" => Manifest::Environment(union::decode_at(doc, &root)?),
            other => {
                return Err(DecodeError::document(
                    "type",
                    format!("unknown manifest type \"{}\", expected one of: {}", other, KINDS.join(", ")),
                ))
            }
        })
    }

    /// Encodes the manifest as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Returns the manifest name.
    pub fn name(&self) -> &str {
        match self {
            Manifest::LoadBalancedWebService(w) => &w.name,
            Manifest::BackendService(w) => &w.name,
            Manifest::WorkerService(w) => &w.name,
            Manifest::ScheduledJob(w) => &w.name,
            Manifest::Environment(e) => &e.name,
        }
    }

    /// Returns the manifest kind as written in `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Manifest::LoadBalancedWebService(_) => KINDS[0],
            Manifest::BackendService(_) => KINDS[1],
            Manifest::WorkerService(_) => KINDS[2],
            Manifest::ScheduledJob(_) => KINDS[3],
            Manifest::Environment(_) => KINDS[4],
        }
    }

    /// Returns the environments that carry an override, sorted.
    pub fn environment_names(&self) -> Vec<&str> {
        match self {
            Manifest::LoadBalancedWebService(w) => w.environment_names(),
            Manifest::BackendService(w) => w.environment_names(),
            Manifest::WorkerService(w) => w.environment_names(),
            Manifest::ScheduledJob(w) => w.environment_names(),
            Manifest::Environment(_) => Vec::new(),
        }
    }

    /// Returns the manifest resolved for `env`. The receiver is left
    /// untouched; environment manifests resolve to themselves.
    pub fn apply_env(&self, env: &str) -> Result<Manifest, MergeError> {
        Ok(match self {
            Manifest::LoadBalancedWebService(w) => Manifest::LoadBalancedWebService(w.apply_env(env)?),
            Manifest::BackendService(w) => Manifest::BackendService(w.apply_env(env)?),
            Manifest::WorkerService(w) => Manifest::WorkerService(w.apply_env(env)?),
            Manifest::ScheduledJob(w) => Manifest::ScheduledJob(w.apply_env(env)?),
            Manifest::Environment(e) => Manifest::Environment(e.clone()),
        })
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = Value::deserialize(deserializer)?;
        Manifest::decode(doc).map_err(D::Error::custom)
    }
}

impl Validate for Manifest {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        match self {
            Manifest::LoadBalancedWebService(w) => w.validate_at(path, errors),
            Manifest::BackendService(w) => w.validate_at(path, errors),
            Manifest::WorkerService(w) => w.validate_at(path, errors),
            Manifest::ScheduledJob(w) => w.validate_at(path, errors),
            Manifest::Environment(e) => e.validate_at(path, errors),
        }
    }
}

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9\-]*$").expect("name pattern is valid"));

/// Checks a workload or environment name.
pub(crate) fn validate_name(path: &Path, name: &str, errors: &mut ValidationErrors) {
    if name.is_empty() {
        errors.add(ValidationError::missing_field(path.clone(), "name"));
    } else {
        name_format(&path.child("name"), name, errors);
    }
}

/// Checks that a value located at `path` is a valid name.
pub(crate) fn name_format(path: &Path, name: &str, errors: &mut ValidationErrors) {
    if !NAME.is_match(name) {
        errors.add(
            ValidationError::invalid_format(path.clone(), format!("name \"{}\" is invalid", name))
                .with_hint("use lowercase letters, digits and hyphens, starting with a letter"),
        );
    }
}

macro_rules! group {
    ($ty:ty, [$($field:literal),+], $is_set:expr, $clear:expr) => {
        ExclusiveGroup::<$ty>::new(&[$($field),+], $is_set, $clear)
    };
}

/// Registers every exclusive pair of the catalog.
pub fn register_exclusive_fields(registry: &mut Registry) {
    registry.register(
        group!(Image, ["build"], |i| !i.build.is_unset(), |i| i.build = Union::Unset),
        group!(Image, ["location"], |i| i.location.is_some(), |i| i.location = None),
    );
    registry.register(
        group!(Count, ["value"], |c| c.value.is_some(), |c| c.value = None),
        group!(
            Count,
            ["advanced_count"],
            |c| !c.advanced_count.is_zero(),
            |c| c.advanced_count = AdvancedCount::default()
        ),
    );
    registry.register(
        group!(AdvancedCount, ["spot"], |c| c.spot.is_some(), |c| c.spot = None),
        ExclusiveGroup::<AdvancedCount>::new(
            AUTOSCALING_FIELDS,
            |c| c.has_autoscaling_group(),
            |c| {
                c.range = Range::default();
                c.cpu_percentage = Union::Unset;
                c.memory_percentage = Union::Unset;
                c.requests = Union::Unset;
                c.response_time = Union::Unset;
            },
        ),
    );
    registry.register(
        group!(Range, ["value"], |r| r.value.is_some(), |r| r.value = None),
        group!(
            Range,
            ["range_config"],
            |r| !r.range_config.is_zero(),
            |r| r.range_config = RangeConfig::default()
        ),
    );
    registry.register(
        group!(HealthCheckArgsOrString, ["path"], |h| h.path.is_some(), |h| h.path = None),
        group!(
            HealthCheckArgsOrString,
            ["args"],
            |h| !h.args.is_zero(),
            |h| h.args = HttpHealthCheckArgs::default()
        ),
    );
    registry.register(
        group!(
            EfsVolumeConfiguration,
            ["id", "root_dir", "auth"],
            |e| e.id.is_some() || e.root_dir.is_some() || e.auth.is_some(),
            |e| {
                e.id = None;
                e.root_dir = None;
                e.auth = None;
            }
        ),
        group!(
            EfsVolumeConfiguration,
            ["uid", "gid"],
            |e| e.uid.is_some() || e.gid.is_some(),
            |e| {
                e.uid = None;
                e.gid = None;
            }
        ),
    );
    registry.register(
        group!(EnvironmentVpc, ["id"], |v| v.id.is_some(), |v| v.id = None),
        group!(
            EnvironmentVpc,
            ["cidr", "subnets"],
            |v| v.cidr.is_some() || v.subnets.is_some(),
            |v| {
                v.cidr = None;
                v.subnets = None;
            }
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_catalog_pairs() {
        let described = crate::exclusive::registry().describe();
        let names: Vec<&str> = described.iter().map(|(name, _)| *name).collect();
        for expected in [
            "AdvancedCount",
            "Count",
            "EfsVolumeConfiguration",
            "EnvironmentVpc",
            "HealthCheckArgsOrString",
            "Image",
            "Range",
        ] {
            assert!(names.contains(&expected), "{} missing from {:?}", expected, names);
        }
    }

    #[test]
    fn test_validate_name() {
        let mut errors = ValidationErrors::new();
        validate_name(&Path::new(), "api", &mut errors);
        validate_name(&Path::new(), "front-end-2", &mut errors);
        assert!(errors.is_empty());
        validate_name(&Path::new(), "", &mut errors);
        validate_name(&Path::new(), "Front_End", &mut errors);
        validate_name(&Path::new(), "2fast", &mut errors);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_kind_and_name() {
        let manifest = Manifest::from_yaml(
            "name: api\ntype: Backend Service\nimage:\n  location: nginx\nenvironments:\n  test: {}\n  prod:\n    count: 3\n",
        )
        .unwrap();
        assert_eq!(manifest.kind(), "Backend Service");
        assert_eq!(manifest.name(), "api");
        assert_eq!(manifest.environment_names(), vec!["prod", "test"]);
    }

    #[test]
    fn test_unknown_kind() {
        let err = Manifest::from_yaml("name: api\ntype: Lambda\n").unwrap_err();
        assert!(err.to_string().contains("Lambda"));
    }
}
