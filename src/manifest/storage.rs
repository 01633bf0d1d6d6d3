//! Task storage: ephemeral disk and mounted volumes.

use crate::fieldpath::Path;
use crate::union::Union;
use crate::validate::{self, Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage configures the task's disk and volumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly_fs: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Volume>,
}

crate::impl_merge!(Storage {
    ephemeral,
    readonly_fs,
    volumes,
});

/// Ephemeral storage bounds in GiB.
pub const EPHEMERAL_RANGE: (u32, u32) = (20, 200);

impl Validate for Storage {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(ephemeral) = self.ephemeral {
            let (lo, hi) = EPHEMERAL_RANGE;
            validate::within(&path.child("ephemeral"), ephemeral, lo, hi, errors);
        }
        self.volumes.validate_at(&path.child("volumes"), errors);
    }
}

/// Volume is a named volume mounted into the main container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub efs: EfsConfigOrBool,
}

crate::impl_merge!(Volume { path, read_only, efs });

impl Validate for Volume {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "path", self.path.is_some(), errors);
        self.efs.validate_at(&path.child("efs"), errors);
    }
}

/// EfsConfigOrBool is `efs: true` for a managed file system, or its settings.
pub type EfsConfigOrBool = Union<bool, EfsVolumeConfiguration>;

/// EfsVolumeConfiguration either references an existing file system (`id`,
/// `root_dir`, `auth`) or sets the POSIX owner of a managed one (`uid`, `gid`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfsVolumeConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthorizationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

crate::impl_is_zero!(EfsVolumeConfiguration {
    id,
    root_dir,
    auth,
    uid,
    gid,
});

crate::impl_merge!(EfsVolumeConfiguration {
    id,
    root_dir,
    auth,
    uid,
    gid,
});

impl EfsVolumeConfiguration {
    /// Returns true if the settings describe a managed file system.
    pub fn is_managed(&self) -> bool {
        self.id.is_none()
    }
}

impl Validate for EfsVolumeConfiguration {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        validate::require_if(path, ("gid", self.gid.is_some()), ("uid", self.uid.is_some()), errors);
        validate::require_if(path, ("uid", self.uid.is_some()), ("gid", self.gid.is_some()), errors);
        if self.uid == Some(0) {
            errors.add(
                ValidationError::invalid_range(path.child("uid"), "uid must not be 0")
                    .with_hint("pick a non-root user id"),
            );
        }
        if let Some(root_dir) = &self.root_dir {
            if !root_dir.starts_with('/') {
                errors.add(ValidationError::invalid_format(
                    path.child("root_dir"),
                    format!("root directory \"{}\" must be an absolute path", root_dir),
                ));
            }
        }
        let access_point = self
            .auth
            .as_ref()
            .and_then(|auth| auth.access_point_id.as_ref());
        if access_point.is_some() {
            if self.root_dir.as_deref().is_some_and(|dir| dir != "/") {
                errors.add(ValidationError::inconsistent(
                    path.clone(),
                    "\"root_dir\" must be empty or \"/\" when \"auth.access_point_id\" is specified",
                ));
            }
            if self.auth.as_ref().and_then(|auth| auth.iam) == Some(false) {
                errors.add(ValidationError::inconsistent(
                    path.child("auth"),
                    "\"iam\" must be true when \"access_point_id\" is specified",
                ));
            }
        }
    }
}

/// AuthorizationConfig controls how the task authenticates to the file system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_point_id: Option<String>,
}

crate::impl_merge!(AuthorizationConfig { iam, access_point_id });

#[cfg(test)]
mod tests {
    use super::*;

    fn efs(yaml: &str) -> EfsConfigOrBool {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_efs_forms() {
        assert_eq!(efs("true"), Union::Basic(true));
        let config = efs("id: fs-1234\nroot_dir: /data");
        assert!(!config.advanced().unwrap().is_managed());
        let config = efs("uid: 1000\ngid: 1000");
        assert!(config.advanced().unwrap().is_managed());
    }

    #[test]
    fn test_uid_and_gid_go_together() {
        let errors = efs("gid: 1000").validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.iter().next().unwrap(),
            ValidationError::MissingConditionalField { field, trigger, .. }
                if field == "uid" && trigger == "gid"
        ));
    }

    #[test]
    fn test_managed_and_existing_conflict() {
        let errors = efs("id: fs-1234\nuid: 1000\ngid: 1000").validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ExclusiveFieldConflict { .. })));
    }

    #[test]
    fn test_access_point_rules() {
        let errors = efs("id: fs-1\nroot_dir: /data\nauth: {iam: false, access_point_id: ap-1}")
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::InconsistentFields { .. })));
    }

    #[test]
    fn test_storage_paths() {
        let storage: Storage = serde_yaml::from_str(
            "ephemeral: 10\nvolumes:\n  data:\n    efs: true\n  cache:\n    path: /cache\n",
        )
        .unwrap();
        let errors = storage.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["ephemeral", "volumes[data]"]);
    }
}
