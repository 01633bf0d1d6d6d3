//! Environment manifests: the network an environment's workloads run in.

use crate::fieldpath::Path;
use crate::validate::format::{self, Cidr};
use crate::validate::{self, Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};

/// EnvironmentManifest describes an environment. It has no per-environment
/// overrides of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<EnvironmentNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<Observability>,
}

impl Validate for EnvironmentManifest {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        super::validate_name(path, &self.name, errors);
        self.network.validate_at(&path.child("network"), errors);
    }
}

/// EnvironmentNetwork wraps the VPC settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<EnvironmentVpc>,
}

impl Validate for EnvironmentNetwork {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.vpc.validate_at(&path.child("vpc"), errors);
    }
}

/// EnvironmentVpc imports an existing VPC by `id`, or describes a new one
/// by `cidr` and `subnets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVpc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnets: Option<SubnetsConfig>,
}

impl Validate for EnvironmentVpc {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        let vpc_cidr = self
            .cidr
            .as_deref()
            .and_then(|cidr| format::cidr(&path.child("cidr"), cidr, errors));

        let Some(subnets) = &self.subnets else {
            return;
        };
        let subnets_path = path.child("subnets");
        let mut parsed: Vec<(Path, Cidr)> = Vec::new();
        for (tier, list) in [("public", &subnets.public), ("private", &subnets.private)] {
            let tier_path = subnets_path.child(tier);
            for (i, subnet) in list.iter().flatten().enumerate() {
                let subnet_path = tier_path.index(i);
                subnet.validate_at(&subnet_path, errors);
                let Some(cidr) = subnet
                    .cidr
                    .as_deref()
                    .and_then(|cidr| cidr.parse::<Cidr>().ok())
                else {
                    continue;
                };
                if let Some(vpc) = vpc_cidr {
                    if !vpc.contains(&cidr) {
                        errors.add(
                            ValidationError::inconsistent(
                                subnet_path.child("cidr"),
                                format!("subnet {} is not inside the VPC range {}", cidr, vpc),
                            )
                            .with_hint("pick a subnet range inside the VPC \"cidr\""),
                        );
                    }
                }
                if let Some((other_path, other)) = parsed.iter().find(|(_, other)| other.overlaps(&cidr)) {
                    errors.add(ValidationError::inconsistent(
                        subnet_path.child("cidr"),
                        format!("subnet {} overlaps {} at {}", cidr, other, other_path),
                    ));
                }
                parsed.push((subnet_path, cidr));
            }
        }
    }
}

/// SubnetsConfig lists the public and private subnets of a VPC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<Vec<SubnetConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Vec<SubnetConfig>>,
}

/// SubnetConfig is one subnet, imported by `id` or described by `cidr`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,
}

impl Validate for SubnetConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require_one_of(
            path,
            &[("id", self.id.is_some()), ("cidr", self.cidr.is_some())],
            errors,
        );
        if let Some(cidr) = &self.cidr {
            format::cidr(&path.child("cidr"), cidr, errors);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_insights: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc(yaml: &str) -> EnvironmentVpc {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_vpc() {
        let v = vpc(
            "cidr: 10.0.0.0/16\nsubnets:\n  public:\n    - cidr: 10.0.0.0/24\n      az: us-west-2a\n  private:\n    - cidr: 10.0.1.0/24\n",
        );
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_subnet_outside_vpc() {
        let v = vpc("cidr: 10.0.0.0/16\nsubnets:\n  public:\n    - cidr: 10.1.0.0/24\n");
        let errors = v.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.iter().next().unwrap().path().to_string(),
            "subnets.public[0].cidr"
        );
    }

    #[test]
    fn test_overlapping_subnets() {
        let v = vpc(
            "cidr: 10.0.0.0/16\nsubnets:\n  public:\n    - cidr: 10.0.0.0/24\n  private:\n    - cidr: 10.0.0.128/25\n",
        );
        let errors = v.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.to_string().contains("overlaps"));
    }

    #[test]
    fn test_bad_cidrs() {
        let v = vpc("cidr: 10.0.0.0\nsubnets:\n  private:\n    - az: us-west-2b\n");
        let errors = v.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["cidr", "subnets.private[0]"]);
    }

    #[test]
    fn test_imported_and_new_vpc_conflict() {
        let errors = vpc("id: vpc-1234\ncidr: 10.0.0.0/16").validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ExclusiveFieldConflict { .. })));
    }
}
