//! Task-level settings shared by every workload kind.

use super::count::Count;
use super::storage::Storage;
use crate::fieldpath::Path;
use crate::union::IsZero;
use crate::validate::{format, Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TaskConfig is inlined into every workload kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Count::is_zero")]
    pub count: Count,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
}

crate::impl_merge!(TaskConfig {
    cpu,
    memory,
    platform,
    count,
    exec,
    variables,
    secrets,
    env_file,
    storage,
});

impl TaskConfig {
    /// Returns true if the platform is a Windows one.
    pub fn is_windows(&self) -> bool {
        self.platform
            .as_deref()
            .is_some_and(|p| p.starts_with("windows"))
    }
}

/// Minimum task size on Windows platforms.
const WINDOWS_MIN_CPU: u32 = 1024;
const WINDOWS_MIN_MEMORY: u32 = 2048;

impl Validate for TaskConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        for (name, value) in [("cpu", self.cpu), ("memory", self.memory)] {
            if value == Some(0) {
                errors.add(ValidationError::invalid_range(
                    path.child(name),
                    format!("{} must be greater than 0", name),
                ));
            }
        }
        if let Some(platform) = &self.platform {
            format::platform(&path.child("platform"), platform, errors);
        }
        if self.is_windows() {
            if self.cpu.is_some_and(|cpu| cpu < WINDOWS_MIN_CPU) {
                errors.add(windows_minimum(path, "cpu", WINDOWS_MIN_CPU));
            }
            if self.memory.is_some_and(|memory| memory < WINDOWS_MIN_MEMORY) {
                errors.add(windows_minimum(path, "memory", WINDOWS_MIN_MEMORY));
            }
            if self.exec == Some(true) {
                errors.add(ValidationError::inconsistent(
                    path.child("exec"),
                    "\"exec\" is not supported on Windows platforms",
                ));
            }
        }
        self.count.validate_at(&path.child("count"), errors);
        self.storage.validate_at(&path.child("storage"), errors);
    }
}

fn windows_minimum(path: &Path, field: &str, min: u32) -> ValidationError {
    ValidationError::inconsistent(
        path.child(field),
        format!("\"{}\" must be at least {} on Windows platforms", field, min),
    )
    .with_hint(format!("set \"{}\" to {} or more", field, min))
}

/// Accepted deployment strategies.
pub const ROLLING_STRATEGIES: &[&str] = &["default", "recreate"];

/// DeploymentConfig chooses how new tasks replace old ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling: Option<String>,
}

crate::impl_merge!(DeploymentConfig { rolling });

impl Validate for DeploymentConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(rolling) = &self.rolling {
            format::one_of(&path.child("rolling"), rolling, ROLLING_STRATEGIES, errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_inline_fields() {
        let task: TaskConfig = serde_yaml::from_str(
            "cpu: 256\nmemory: 512\ncount: 2\nvariables:\n  LOG_LEVEL: info\n",
        )
        .unwrap();
        assert_eq!(task.count, Count::fixed(2));
        assert_eq!(task.variables["LOG_LEVEL"], "info");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_windows_constraints() {
        let task: TaskConfig = serde_yaml::from_str(
            "cpu: 256\nmemory: 512\nplatform: windows_server_2019_core/x86_64\nexec: true",
        )
        .unwrap();
        let errors = task.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["cpu", "memory", "exec"]);
    }

    #[test]
    fn test_count_path() {
        let task: TaskConfig = serde_yaml::from_str("count:\n  range: 3-1\n  requests: 10").unwrap();
        let errors = task.validate().unwrap_err();
        assert_eq!(errors.iter().next().unwrap().path().to_string(), "count.range");
    }

    #[test]
    fn test_deployment_strategy() {
        let deployment = DeploymentConfig {
            rolling: Some("blue-green".into()),
        };
        assert_eq!(deployment.validate().unwrap_err().len(), 1);
    }
}
