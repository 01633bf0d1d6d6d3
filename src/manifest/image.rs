//! Container image and container health check settings.

use super::types::{std_duration, HumanDuration, PortMapping};
use crate::fieldpath::Path;
use crate::union::{StringOrStringSlice, Union};
use crate::validate::{self, format, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Image is where the main container comes from: a prebuilt `location` or a
/// `build` of a Dockerfile. The two are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub build: BuildArgsOrString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ContainerHealthCheck>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, String>,
}

crate::impl_merge!(Image {
    build,
    location,
    credentials,
    port,
    healthcheck,
    labels,
    depends_on,
});

/// Container states another container can wait for.
pub const DEPENDS_ON_CONDITIONS: &[&str] = &["start", "complete", "success", "healthy"];

impl Validate for Image {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        validate::require_one_of(
            path,
            &[("build", !self.build.is_unset()), ("location", self.location.is_some())],
            errors,
        );
        self.build.validate_at(&path.child("build"), errors);
        self.port.validate_at(&path.child("port"), errors);
        self.healthcheck.validate_at(&path.child("healthcheck"), errors);
        validate_depends_on(&self.depends_on, &path.child("depends_on"), errors);
    }
}

pub(crate) fn validate_depends_on(
    depends_on: &BTreeMap<String, String>,
    path: &Path,
    errors: &mut ValidationErrors,
) {
    for (container, condition) in depends_on {
        format::one_of(&path.key(container), condition, DEPENDS_ON_CONDITIONS, errors);
    }
}

/// BuildArgsOrString is a build context directory or full docker build arguments.
pub type BuildArgsOrString = Union<String, DockerBuildArgs>;

/// DockerBuildArgs are the arguments of a `docker build`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerBuildArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_from: Option<Vec<String>>,
}

crate::impl_is_zero!(DockerBuildArgs {
    context,
    dockerfile,
    args,
    target,
    cache_from,
});

crate::impl_merge!(DockerBuildArgs {
    context,
    dockerfile,
    args,
    target,
    cache_from,
});

impl Validate for DockerBuildArgs {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require_one_of(
            path,
            &[("context", self.context.is_some()), ("dockerfile", self.dockerfile.is_some())],
            errors,
        );
    }
}

impl DockerBuildArgs {
    /// Returns the Dockerfile path, defaulting to `<context>/Dockerfile`.
    pub fn dockerfile_path(&self) -> Option<String> {
        match (&self.dockerfile, &self.context) {
            (Some(dockerfile), _) => Some(dockerfile.clone()),
            (None, Some(context)) => Some(format!("{}/Dockerfile", context.trim_end_matches('/'))),
            (None, None) => None,
        }
    }
}

/// ContainerHealthCheck is a command-based health check run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerHealthCheck {
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<HumanDuration>,
}

crate::impl_merge!(ContainerHealthCheck {
    command,
    interval,
    retries,
    timeout,
    start_period,
});

impl Validate for ContainerHealthCheck {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::positive_duration(&path.child("interval"), std_duration(&self.interval), errors);
        validate::positive_duration(&path.child("timeout"), std_duration(&self.timeout), errors);
        if let Some(retries) = self.retries {
            validate::within(&path.child("retries"), retries, 1, 10, errors);
        }
    }
}
