//! Workload kinds and the environment override entry point.

use super::http::{http_enabled, HttpOrBool, NlbConfig};
use super::image::Image;
use super::network::NetworkConfig;
use super::sidecar::SidecarConfig;
use super::task::{DeploymentConfig, TaskConfig};
use super::types::{std_duration, HumanDuration, PortMapping};
use super::worker::SubscribeConfig;
use crate::fieldpath::Path;
use crate::merge::{Merge, MergeError};
use crate::union::{self, DecodeError, StringOrStringSlice, Union};
use crate::validate::format::{self, Protocol};
use crate::validate::{self, Validate, ValidationError, ValidationErrors};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// WorkloadConfig is the per-kind body of a workload manifest. The same type
/// holds the base config and each environment's override fragment.
pub trait WorkloadConfig: Merge + Validate + Clone + Default + DeserializeOwned {
    /// Checks that need the workload name, which is also the main
    /// container's name.
    fn validate_containers(&self, name: &str, path: &Path, errors: &mut ValidationErrors);

    /// Decodes a base config or an override fragment located at `path`.
    /// A null fragment is an empty override.
    fn decode_at(value: Value, path: &Path) -> Result<Self, DecodeError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        // The inlined task settings are decoded on their own first so their
        // failures keep a field path.
        union::decode_at::<TaskConfig>(value.clone(), path)?;
        union::decode_at(value, path)
    }
}

/// Workload is a named config plus its environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workload<C> {
    pub name: String,
    #[serde(flatten)]
    pub config: C,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, C>,
}

/// The keys of a workload document outside its config.
#[derive(Deserialize)]
struct Outline {
    name: String,
    #[serde(default)]
    environments: BTreeMap<String, Value>,
}

impl<C: WorkloadConfig> Workload<C> {
    /// Decodes a workload document located at `path`, reporting failures at
    /// the full path of the field, overrides included.
    pub fn decode_at(doc: Value, path: &Path) -> Result<Self, DecodeError> {
        let outline: Outline = union::decode_at(doc.clone(), path)?;
        let config = C::decode_at(doc, path)?;
        let overrides = path.child("environments");
        let mut environments = BTreeMap::new();
        for (env, fragment) in outline.environments {
            let fragment = C::decode_at(fragment, &overrides.key(&env))?;
            environments.insert(env, fragment);
        }
        Ok(Workload {
            name: outline.name,
            config,
            environments,
        })
    }

    /// Returns the names of the environments that carry an override.
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// Returns the workload resolved for `env`: a copy of the base with the
    /// environment's fragment merged on top and the overrides table dropped.
    /// An environment without an override resolves to the base.
    pub fn apply_env(&self, env: &str) -> Result<Workload<C>, MergeError> {
        let mut resolved = Workload {
            name: self.name.clone(),
            config: self.config.clone(),
            environments: BTreeMap::new(),
        };
        let Some(fragment) = self.environments.get(env).cloned() else {
            tracing::debug!(workload = %self.name, env, "no override for environment");
            return Ok(resolved);
        };
        let path = Path::new().child("environments").key(env);
        resolved.config.merge_at(fragment, &path)?;
        tracing::debug!(workload = %self.name, env, "applied environment override");
        Ok(resolved)
    }
}

impl<'de, C: WorkloadConfig> Deserialize<'de> for Workload<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = Value::deserialize(deserializer)?;
        Workload::decode_at(doc, &Path::new()).map_err(D::Error::custom)
    }
}

impl<C: WorkloadConfig> Validate for Workload<C> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        super::validate_name(path, &self.name, errors);
        self.config.validate_at(path, errors);
        self.config.validate_containers(&self.name, path, errors);
    }
}

/// Containers of one task, gathered for checks across siblings.
struct Containers<'a> {
    main: &'a str,
    image: &'a Image,
    sidecars: &'a BTreeMap<String, SidecarConfig>,
    task: &'a TaskConfig,
}

impl Containers<'_> {
    fn is_known(&self, name: &str) -> bool {
        name == self.main || self.sidecars.contains_key(name)
    }

    fn validate(&self, path: &Path, errors: &mut ValidationErrors) {
        self.validate_ports(path, errors);
        self.validate_depends_on(path, errors);
        self.validate_mount_points(path, errors);
    }

    fn validate_ports(&self, path: &Path, errors: &mut ValidationErrors) {
        let mut exposed: BTreeMap<u16, (Protocol, Path)> = BTreeMap::new();
        let main = self
            .image
            .port
            .as_ref()
            .map(|port| (path.child("image").child("port"), port));
        let sidecars = self.sidecars.iter().filter_map(|(name, sidecar)| {
            sidecar
                .port
                .as_ref()
                .map(|port| (path.child("sidecars").key(name).child("port"), port))
        });
        for (port_path, port) in main.into_iter().chain(sidecars) {
            let Ok((number, protocol)) = PortMapping::parse(port) else {
                continue;
            };
            match exposed.get(&number) {
                Some((other, other_path)) if *other != protocol => errors.add(
                    ValidationError::inconsistent(
                        port_path,
                        format!(
                            "port {} is exposed as {} here and as {} at {}",
                            number, protocol, other, other_path
                        ),
                    )
                    .with_hint("use one protocol per port across the task's containers"),
                ),
                Some((_, other_path)) => errors.add(ValidationError::inconsistent(
                    port_path,
                    format!("port {} is also exposed at {}", number, other_path),
                )),
                None => {
                    exposed.insert(number, (protocol, port_path));
                }
            }
        }
    }

    fn validate_depends_on(&self, path: &Path, errors: &mut ValidationErrors) {
        let main = std::iter::once((
            self.main,
            &self.image.depends_on,
            path.child("image").child("depends_on"),
        ));
        let sidecars = self.sidecars.iter().map(|(name, sidecar)| {
            (
                name.as_str(),
                &sidecar.depends_on,
                path.child("sidecars").key(name).child("depends_on"),
            )
        });
        for (container, depends_on, depends_path) in main.chain(sidecars) {
            for target in depends_on.keys() {
                if target == container {
                    errors.add(ValidationError::inconsistent(
                        depends_path.key(target),
                        format!("container \"{}\" cannot depend on itself", container),
                    ));
                } else if !self.is_known(target) {
                    errors.add(unknown_container(depends_path.key(target), target));
                }
            }
        }
    }

    fn validate_mount_points(&self, path: &Path, errors: &mut ValidationErrors) {
        let volumes = self.task.storage.as_ref().map(|s| &s.volumes);
        for (name, sidecar) in self.sidecars {
            let Some(mount_points) = &sidecar.mount_points else {
                continue;
            };
            let mounts_path = path.child("sidecars").key(name).child("mount_points");
            for (i, mount) in mount_points.iter().enumerate() {
                let Some(source) = &mount.source_volume else {
                    continue;
                };
                if !volumes.is_some_and(|v| v.contains_key(source)) {
                    errors.add(
                        ValidationError::inconsistent(
                            mounts_path.index(i).child("source_volume"),
                            format!("volume \"{}\" is not defined in \"storage.volumes\"", source),
                        )
                        .with_hint("add the volume under \"storage.volumes\""),
                    );
                }
            }
        }
    }

    fn validate_target(&self, path: Path, target: Option<&str>, errors: &mut ValidationErrors) {
        if let Some(target) = target {
            if !self.is_known(target) {
                errors.add(unknown_container(path, target));
            }
        }
    }
}

fn unknown_container(path: Path, name: &str) -> ValidationError {
    ValidationError::inconsistent(path, format!("container \"{}\" does not exist", name))
        .with_hint("reference the main container or one of the sidecars")
}

/// LoadBalancedWebServiceConfig is a service behind an application and/or
/// network load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancedWebServiceConfig {
    #[serde(default)]
    pub image: Image,
    #[serde(flatten, deserialize_with = "union::inline")]
    pub task: TaskConfig,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub entrypoint: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub http: HttpOrBool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlb: Option<NlbConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidecars: BTreeMap<String, SidecarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentConfig>,
}

crate::impl_merge!(
    LoadBalancedWebServiceConfig {
        image,
        command,
        entrypoint,
        http,
        nlb,
        sidecars,
        network,
        deployment,
    },
    inline { task }
);

impl Validate for LoadBalancedWebServiceConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        let image_path = path.child("image");
        self.image.validate_at(&image_path, errors);
        validate::require(&image_path, "port", self.image.port.is_some(), errors);
        self.task.validate_at(path, errors);

        let http_path = self.http.advanced().and_then(|http| http.main.path.as_ref());
        let nlb_port = self.nlb.as_ref().and_then(|nlb| nlb.main.port.as_ref());
        validate::require_one_of(
            path,
            &[
                ("http.path", http_enabled(&self.http) && http_path.is_some()),
                ("nlb.port", nlb_port.is_some()),
            ],
            errors,
        );
        self.http.validate_at(&path.child("http"), errors);
        self.nlb.validate_at(&path.child("nlb"), errors);
        self.sidecars.validate_at(&path.child("sidecars"), errors);
        self.network.validate_at(&path.child("network"), errors);
        self.deployment.validate_at(&path.child("deployment"), errors);
    }
}

impl WorkloadConfig for LoadBalancedWebServiceConfig {
    fn validate_containers(&self, name: &str, path: &Path, errors: &mut ValidationErrors) {
        let containers = Containers {
            main: name,
            image: &self.image,
            sidecars: &self.sidecars,
            task: &self.task,
        };
        containers.validate(path, errors);
        if let Some(http) = self.http.advanced() {
            validate_rule_targets(&containers, http, &path.child("http"), errors);
        }
        if let Some(nlb) = &self.nlb {
            let nlb_path = path.child("nlb");
            containers.validate_target(
                nlb_path.child("target_container"),
                nlb.main.target_container.as_deref(),
                errors,
            );
            for (i, listener) in nlb.additional_listeners.iter().flatten().enumerate() {
                containers.validate_target(
                    nlb_path
                        .child("additional_listeners")
                        .index(i)
                        .child("target_container"),
                    listener.target_container.as_deref(),
                    errors,
                );
            }
        }
    }
}

fn validate_rule_targets(
    containers: &Containers<'_>,
    http: &super::http::HttpConfig,
    path: &Path,
    errors: &mut ValidationErrors,
) {
    containers.validate_target(
        path.child("target_container"),
        http.main.target_container.as_deref(),
        errors,
    );
    for (i, rule) in http.additional_rules.iter().flatten().enumerate() {
        containers.validate_target(
            path.child("additional_rules").index(i).child("target_container"),
            rule.target_container.as_deref(),
            errors,
        );
    }
}

/// BackendServiceConfig is a service reachable only from inside the
/// environment, optionally behind an internal load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendServiceConfig {
    #[serde(default)]
    pub image: Image,
    #[serde(flatten, deserialize_with = "union::inline")]
    pub task: TaskConfig,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub entrypoint: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub http: HttpOrBool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidecars: BTreeMap<String, SidecarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentConfig>,
}

crate::impl_merge!(
    BackendServiceConfig {
        image,
        command,
        entrypoint,
        http,
        sidecars,
        network,
        deployment,
    },
    inline { task }
);

impl Validate for BackendServiceConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.image.validate_at(&path.child("image"), errors);
        self.task.validate_at(path, errors);
        if let Some(http) = self.http.advanced() {
            validate::require_if(
                path,
                ("http", true),
                ("image.port", self.image.port.is_some()),
                errors,
            );
            http.validate_at(&path.child("http"), errors);
        }
        self.sidecars.validate_at(&path.child("sidecars"), errors);
        self.network.validate_at(&path.child("network"), errors);
        self.deployment.validate_at(&path.child("deployment"), errors);
    }
}

impl WorkloadConfig for BackendServiceConfig {
    fn validate_containers(&self, name: &str, path: &Path, errors: &mut ValidationErrors) {
        let containers = Containers {
            main: name,
            image: &self.image,
            sidecars: &self.sidecars,
            task: &self.task,
        };
        containers.validate(path, errors);
        if let Some(http) = self.http.advanced() {
            validate_rule_targets(&containers, http, &path.child("http"), errors);
        }
    }
}

/// WorkerServiceConfig is a service that consumes messages from topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerServiceConfig {
    #[serde(default)]
    pub image: Image,
    #[serde(flatten, deserialize_with = "union::inline")]
    pub task: TaskConfig,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub entrypoint: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<SubscribeConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidecars: BTreeMap<String, SidecarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentConfig>,
}

crate::impl_merge!(
    WorkerServiceConfig {
        image,
        command,
        entrypoint,
        subscribe,
        sidecars,
        network,
        deployment,
    },
    inline { task }
);

impl Validate for WorkerServiceConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.image.validate_at(&path.child("image"), errors);
        self.task.validate_at(path, errors);
        self.subscribe.validate_at(&path.child("subscribe"), errors);
        self.sidecars.validate_at(&path.child("sidecars"), errors);
        self.network.validate_at(&path.child("network"), errors);
        self.deployment.validate_at(&path.child("deployment"), errors);
    }
}

impl WorkloadConfig for WorkerServiceConfig {
    fn validate_containers(&self, name: &str, path: &Path, errors: &mut ValidationErrors) {
        Containers {
            main: name,
            image: &self.image,
            sidecars: &self.sidecars,
            task: &self.task,
        }
        .validate(path, errors);
    }
}

/// ScheduledJobConfig is a task run on a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJobConfig {
    #[serde(default)]
    pub image: Image,
    #[serde(flatten, deserialize_with = "union::inline")]
    pub task: TaskConfig,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub command: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub entrypoint: StringOrStringSlice,
    #[serde(default)]
    pub on: JobTriggerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidecars: BTreeMap<String, SidecarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
}

crate::impl_merge!(
    ScheduledJobConfig {
        image,
        command,
        entrypoint,
        on,
        retries,
        timeout,
        sidecars,
        network,
    },
    inline { task }
);

/// Maximum number of retries of a failed job run.
pub const MAX_JOB_RETRIES: u32 = 10;

impl Validate for ScheduledJobConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.image.validate_at(&path.child("image"), errors);
        self.task.validate_at(path, errors);
        self.on.validate_at(&path.child("on"), errors);
        if let Some(retries) = self.retries {
            validate::within(&path.child("retries"), retries, 0, MAX_JOB_RETRIES, errors);
        }
        validate::positive_duration(&path.child("timeout"), std_duration(&self.timeout), errors);
        if self.task.count.has_autoscaling() {
            errors.add(ValidationError::inconsistent(
                path.child("count"),
                "a scheduled job cannot autoscale",
            ));
        }
        self.sidecars.validate_at(&path.child("sidecars"), errors);
        self.network.validate_at(&path.child("network"), errors);
    }
}

impl WorkloadConfig for ScheduledJobConfig {
    fn validate_containers(&self, name: &str, path: &Path, errors: &mut ValidationErrors) {
        Containers {
            main: name,
            image: &self.image,
            sidecars: &self.sidecars,
            task: &self.task,
        }
        .validate(path, errors);
    }
}

/// JobTriggerConfig is when a scheduled job runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTriggerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

crate::impl_merge!(JobTriggerConfig { schedule });

impl Validate for JobTriggerConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        match &self.schedule {
            Some(schedule) => format::schedule(&path.child("schedule"), schedule, errors),
            None => validate::require(path, "schedule", false, errors),
        }
    }
}
