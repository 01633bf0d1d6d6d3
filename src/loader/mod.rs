//! Loader module - The full manifest pipeline.
//!
//! A document is interpolated, decoded, resolved for one environment and
//! validated. Each stage fails with its own error, wrapped in [`Error`].

use crate::interpolate::{InterpolateError, Interpolator};
use crate::manifest::Manifest;
use crate::merge::MergeError;
use crate::union::DecodeError;
use crate::validate::{Validate, ValidationErrors};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reserved variable holding the application name.
pub const APP_NAME: &str = "APP_NAME";
/// Reserved variable holding the environment being resolved.
pub const ENVIRONMENT_NAME: &str = "ENVIRONMENT_NAME";

/// Error represents a failure at any stage of loading a manifest.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("interpolating manifest: {0}")]
    Interpolate(#[from] InterpolateError),

    #[error("decoding manifest: {0}")]
    Decode(#[from] DecodeError),

    #[error("applying environment override: {0}")]
    Merge(#[from] MergeError),

    #[error("manifest is invalid:\n{0}")]
    Validation(#[from] ValidationErrors),
}

/// LoaderBuilder is a builder for creating a Loader.
#[derive(Debug, Default)]
pub struct LoaderBuilder {
    environment: Option<String>,
    interpolator: Interpolator,
    skip_validation: bool,
}

impl LoaderBuilder {
    /// Creates a new LoaderBuilder.
    pub fn new() -> Self {
        LoaderBuilder::default()
    }

    /// Resolves manifests for the named environment. The name is also
    /// available to documents as `${ENVIRONMENT_NAME}`.
    pub fn environment(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.interpolator.set(ENVIRONMENT_NAME, name.clone());
        self.environment = Some(name);
        self
    }

    /// Sets the application name, available as `${APP_NAME}`.
    pub fn app(mut self, name: impl Into<String>) -> Self {
        self.interpolator.set(APP_NAME, name);
        self
    }

    /// Defines an interpolation variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.interpolator.set(name, value);
        self
    }

    /// Defines several interpolation variables.
    pub fn variables<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            self.interpolator.set(name, value);
        }
        self
    }

    /// Sets whether to return the resolved manifest without validating it.
    pub fn skip_validation(mut self, value: bool) -> Self {
        self.skip_validation = value;
        self
    }

    /// Builds the Loader.
    pub fn build(self) -> Loader {
        Loader {
            environment: self.environment,
            interpolator: self.interpolator,
            skip_validation: self.skip_validation,
        }
    }
}

/// Loader turns manifest documents into resolved, validated manifests.
#[derive(Debug, Default)]
pub struct Loader {
    environment: Option<String>,
    interpolator: Interpolator,
    skip_validation: bool,
}

impl Loader {
    /// Creates a new LoaderBuilder.
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::new()
    }

    /// Returns the environment manifests are resolved for, if any.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Decodes a document without resolving or validating it.
    pub fn decode(&self, raw: &str) -> Result<Manifest, Error> {
        let text = self.interpolator.interpolate(raw)?;
        Ok(Manifest::from_yaml(&text)?)
    }

    /// Runs the full pipeline over a document.
    pub fn load(&self, raw: &str) -> Result<Manifest, Error> {
        let manifest = self.decode(raw)?;
        let manifest = match &self.environment {
            Some(env) => manifest.apply_env(env)?,
            None => manifest,
        };
        if self.skip_validation {
            tracing::debug!(name = manifest.name(), "skipping validation");
        } else {
            manifest.validate()?;
        }
        tracing::debug!(
            name = manifest.name(),
            kind = manifest.kind(),
            environment = self.environment.as_deref().unwrap_or("-"),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Reads and loads a manifest file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = r#"
name: ${APP_NAME}-api
type: Backend Service
image:
  location: example.com/api:${TAG}
  port: 8080
variables:
  STAGE: ${ENVIRONMENT_NAME}
count: 1
environments:
  prod:
    count: 4
"#;

    fn loader(env: &str) -> Loader {
        Loader::builder()
            .app("shop")
            .environment(env)
            .variable("TAG", "1.0")
            .build()
    }

    #[test]
    fn test_load_resolves_environment() {
        let manifest = loader("prod").load(API).unwrap();
        assert_eq!(manifest.name(), "shop-api");
        assert!(manifest.environment_names().is_empty());
        let Manifest::BackendService(w) = manifest else {
            panic!("unexpected kind");
        };
        assert_eq!(w.config.task.count.value, Some(4));
        assert_eq!(w.config.task.variables["STAGE"], "prod");
        assert_eq!(w.config.image.location.as_deref(), Some("example.com/api:1.0"));
    }

    #[test]
    fn test_decode_keeps_overrides() {
        let manifest = loader("test").decode(API).unwrap();
        assert_eq!(manifest.environment_names(), vec!["prod"]);
    }

    #[test]
    fn test_each_stage_reports_its_error() {
        let err = Loader::builder().build().load(API).unwrap_err();
        assert!(matches!(err, Error::Interpolate(_)));

        let err = loader("prod").load("name: x\ntype: Nope\n").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let conflict = format!("{}    image:\n      build: .\n      location: x\n", API);
        let err = loader("prod").load(&conflict).unwrap_err();
        assert!(matches!(err, Error::Merge(_)));

        let invalid = API.replace("count: 1", "count: 1\ncpu: 0");
        let err = loader("prod").load(&invalid).unwrap_err();
        let Error::Validation(errors) = &err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(errors.iter().next().unwrap().path().to_string(), "cpu");
        assert!(err.to_string().starts_with("manifest is invalid:\n"));
    }

    #[test]
    fn test_skip_validation() {
        let invalid = API.replace("count: 1", "count: 1\ncpu: 0");
        let manifest = Loader::builder()
            .variables([("APP_NAME", "shop"), ("TAG", "1"), ("ENVIRONMENT_NAME", "dev")])
            .skip_validation(true)
            .build()
            .load(&invalid)
            .unwrap();
        assert_eq!(manifest.environment_names(), vec!["prod"]);
    }

    #[test]
    fn test_missing_file() {
        let err = loader("prod").load_file("/nonexistent/manifest.yml").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/manifest.yml"));
    }
}
