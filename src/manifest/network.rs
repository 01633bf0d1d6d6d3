//! Workload network placement.

use crate::fieldpath::Path;
use crate::union::Union;
use crate::validate::{format, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Accepted subnet placements.
pub const PLACEMENTS: &[&str] = &["public", "private"];

/// NetworkConfig places the tasks in the environment's network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<VpcConfig>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub connect: ServiceConnectBoolOrArgs,
}

crate::impl_merge!(NetworkConfig { vpc, connect });

impl Validate for NetworkConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.vpc.validate_at(&path.child("vpc"), errors);
        self.connect.validate_at(&path.child("connect"), errors);
    }
}

/// VpcConfig chooses the subnets and security groups of the tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
}

crate::impl_merge!(VpcConfig {
    placement,
    security_groups,
});

impl Validate for VpcConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(placement) = &self.placement {
            format::one_of(&path.child("placement"), placement, PLACEMENTS, errors);
        }
    }
}

/// ServiceConnectBoolOrArgs enables service-to-service discovery, optionally
/// under an alias.
pub type ServiceConnectBoolOrArgs = Union<bool, ServiceConnectArgs>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConnectArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

crate::impl_is_zero!(ServiceConnectArgs { alias });

crate::impl_merge!(ServiceConnectArgs { alias });

impl Validate for ServiceConnectArgs {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(alias) = &self.alias {
            super::name_format(&path.child("alias"), alias, errors);
        }
    }
}
