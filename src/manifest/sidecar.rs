//! Sidecar containers.

use super::image::{validate_depends_on, ContainerHealthCheck};
use super::types::PortMapping;
use crate::fieldpath::Path;
use crate::union::{StringOrStringSlice, Union};
use crate::validate::{self, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SidecarConfig is a container that runs next to the main container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_points: Option<Vec<MountPoint>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ContainerHealthCheck>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub entrypoint: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

crate::impl_merge!(SidecarConfig {
    image,
    port,
    essential,
    credentials,
    variables,
    secrets,
    mount_points,
    depends_on,
    healthcheck,
    command,
    entrypoint,
    labels,
});

impl Validate for SidecarConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "image", self.image.is_some(), errors);
        self.port.validate_at(&path.child("port"), errors);
        self.mount_points.validate_at(&path.child("mount_points"), errors);
        self.healthcheck.validate_at(&path.child("healthcheck"), errors);
        validate_depends_on(&self.depends_on, &path.child("depends_on"), errors);
    }
}

/// MountPoint mounts a task volume into a sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

crate::impl_merge!(MountPoint {
    source_volume,
    path,
    read_only,
});

impl Validate for MountPoint {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "source_volume", self.source_volume.is_some(), errors);
        validate::require(path, "path", self.path.is_some(), errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_validation() {
        let sidecar: SidecarConfig = serde_yaml::from_str(
            "port: 2000/udp\nmount_points:\n  - source_volume: data\ndepends_on:\n  nginx: begin\n",
        )
        .unwrap();
        let errors = sidecar.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec![".", "mount_points[0]", "depends_on[nginx]"]);
    }

    #[test]
    fn test_sidecar_command_forms() {
        let sidecar: SidecarConfig =
            serde_yaml::from_str("image: envoy\ncommand: [envoy, -c, /etc/envoy.yaml]").unwrap();
        assert_eq!(sidecar.command.to_vec().len(), 3);
        assert!(sidecar.validate().is_ok());
    }
}
