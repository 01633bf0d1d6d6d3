//! Load balancer settings: HTTP routing rules, target health checks and
//! network load balancer listeners.

use super::types::{std_duration, HumanDuration, PortMapping};
use crate::fieldpath::Path;
use crate::union::{IsZero, StringOrStringSlice, Union};
use crate::validate::{self, format, Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};

/// HttpOrBool is `http: false` to disable the application load balancer, or
/// the HTTP configuration.
pub type HttpOrBool = Union<bool, HttpConfig>;

/// Returns true unless the load balancer was explicitly disabled.
pub fn http_enabled(http: &HttpOrBool) -> bool {
    !matches!(http, Union::Basic(false))
}

/// HttpConfig is the main routing rule, inlined, plus any additional rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(flatten, deserialize_with = "crate::union::inline")]
    pub main: RoutingRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_rules: Option<Vec<RoutingRule>>,
}

crate::impl_is_zero!(HttpConfig { main, additional_rules });

crate::impl_merge!(HttpConfig { additional_rules }, inline { main });

impl Validate for HttpConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if !self.main.is_zero() {
            let trigger = self.main.first_set_field().unwrap_or("http");
            validate::require_if(path, (trigger, true), ("path", self.main.path.is_some()), errors);
        }
        self.main.validate_at(path, errors);

        let Some(rules) = &self.additional_rules else {
            return;
        };
        let rules_path = path.child("additional_rules");
        for (i, rule) in rules.iter().enumerate() {
            let rule_path = rules_path.index(i);
            validate::require(&rule_path, "path", rule.path.is_some(), errors);
            rule.validate_at(&rule_path, errors);
        }
    }
}

/// Accepted values of `protocol_version`.
pub const PROTOCOL_VERSIONS: &[&str] = &["GRPC", "HTTP1", "HTTP2"];

/// RoutingRule routes requests matching a path or alias to a container port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub alias: StringOrStringSlice,
    #[serde(default, skip_serializing_if = "HealthCheckArgsOrString::is_zero")]
    pub healthcheck: HealthCheckArgsOrString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deregistration_delay: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_source_ips: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to_https: Option<bool>,
}

crate::impl_is_zero!(RoutingRule {
    path,
    alias,
    healthcheck,
    deregistration_delay,
    stickiness,
    allowed_source_ips,
    target_container,
    target_port,
    protocol_version,
    redirect_to_https,
});

crate::impl_merge!(RoutingRule {
    path,
    alias,
    healthcheck,
    deregistration_delay,
    stickiness,
    allowed_source_ips,
    target_container,
    target_port,
    protocol_version,
    redirect_to_https,
});

impl RoutingRule {
    fn first_set_field(&self) -> Option<&'static str> {
        [
            ("alias", !self.alias.is_unset()),
            ("healthcheck", !self.healthcheck.is_zero()),
            ("deregistration_delay", self.deregistration_delay.is_some()),
            ("stickiness", self.stickiness.is_some()),
            ("allowed_source_ips", self.allowed_source_ips.is_some()),
            ("target_container", self.target_container.is_some()),
            ("target_port", self.target_port.is_some()),
            ("protocol_version", self.protocol_version.is_some()),
            ("redirect_to_https", self.redirect_to_https.is_some()),
        ]
        .into_iter()
        .find_map(|(name, set)| set.then_some(name))
    }
}

impl Validate for RoutingRule {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.healthcheck.validate_at(&path.child("healthcheck"), errors);
        if let Some(ips) = &self.allowed_source_ips {
            let ips_path = path.child("allowed_source_ips");
            for (i, ip) in ips.iter().enumerate() {
                format::cidr(&ips_path.index(i), ip, errors);
            }
        }
        if let Some(version) = &self.protocol_version {
            let upper = version.to_ascii_uppercase();
            format::one_of(&path.child("protocol_version"), &upper, PROTOCOL_VERSIONS, errors);
        }
        if self.target_port == Some(0) {
            errors.add(ValidationError::invalid_range(
                path.child("target_port"),
                "port must be between 1 and 65535",
            ));
        }
    }
}

/// HealthCheckArgsOrString is a target health check given as a bare path or
/// as threshold arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Union<String, HttpHealthCheckArgs>",
    into = "Union<String, HttpHealthCheckArgs>"
)]
pub struct HealthCheckArgsOrString {
    pub path: Option<String>,
    pub args: HttpHealthCheckArgs,
}

impl From<Union<String, HttpHealthCheckArgs>> for HealthCheckArgsOrString {
    fn from(u: Union<String, HttpHealthCheckArgs>) -> Self {
        match u {
            Union::Unset => HealthCheckArgsOrString::default(),
            Union::Basic(path) => HealthCheckArgsOrString {
                path: Some(path),
                ..Default::default()
            },
            Union::Advanced(args) => HealthCheckArgsOrString { path: None, args },
        }
    }
}

impl From<HealthCheckArgsOrString> for Union<String, HttpHealthCheckArgs> {
    fn from(hc: HealthCheckArgsOrString) -> Self {
        match hc.path {
            Some(path) => Union::Basic(path),
            None if hc.args.is_zero() => Union::Unset,
            None => Union::Advanced(hc.args),
        }
    }
}

crate::impl_is_zero!(HealthCheckArgsOrString { path, args });

crate::impl_merge!(HealthCheckArgsOrString {}, inline { path, args });

impl HealthCheckArgsOrString {
    /// Returns the health check path from whichever form is set.
    pub fn health_check_path(&self) -> Option<&str> {
        self.path.as_deref().or(self.args.path.as_deref())
    }
}

impl Validate for HealthCheckArgsOrString {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        self.args.validate_at(path, errors);
    }
}

/// HttpHealthCheckArgs configures target group health checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpHealthCheckArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<HumanDuration>,
}

crate::impl_is_zero!(HttpHealthCheckArgs {
    path,
    port,
    success_codes,
    healthy_threshold,
    unhealthy_threshold,
    timeout,
    interval,
    grace_period,
});

crate::impl_merge!(HttpHealthCheckArgs {
    path,
    port,
    success_codes,
    healthy_threshold,
    unhealthy_threshold,
    timeout,
    interval,
    grace_period,
});

/// Bounds of the healthy and unhealthy thresholds.
pub const THRESHOLD_RANGE: (u32, u32) = (2, 10);

impl Validate for HttpHealthCheckArgs {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate_thresholds(
            path,
            self.healthy_threshold,
            self.unhealthy_threshold,
            errors,
        );
        validate_timing(path, &self.timeout, &self.interval, errors);
        if self.port == Some(0) {
            errors.add(ValidationError::invalid_range(
                path.child("port"),
                "port must be between 1 and 65535",
            ));
        }
    }
}

fn validate_thresholds(
    path: &Path,
    healthy: Option<u32>,
    unhealthy: Option<u32>,
    errors: &mut ValidationErrors,
) {
    let (lo, hi) = THRESHOLD_RANGE;
    if let Some(v) = healthy {
        validate::within(&path.child("healthy_threshold"), v, lo, hi, errors);
    }
    if let Some(v) = unhealthy {
        validate::within(&path.child("unhealthy_threshold"), v, lo, hi, errors);
    }
}

fn validate_timing(
    path: &Path,
    timeout: &Option<HumanDuration>,
    interval: &Option<HumanDuration>,
    errors: &mut ValidationErrors,
) {
    validate::positive_duration(&path.child("timeout"), std_duration(timeout), errors);
    validate::positive_duration(&path.child("interval"), std_duration(interval), errors);
    if let (Some(timeout), Some(interval)) = (timeout, interval) {
        if timeout >= interval {
            errors.add(
                ValidationError::inconsistent(
                    path.clone(),
                    format!(
                        "\"timeout\" ({}) must be shorter than \"interval\" ({})",
                        timeout, interval
                    ),
                )
                .with_hint("lower the timeout or raise the interval"),
            );
        }
    }
}

/// NlbConfig configures a network load balancer: the main listener, inlined,
/// plus any additional listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlbConfig {
    #[serde(flatten, deserialize_with = "crate::union::inline")]
    pub main: NlbListener,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<NlbHealthCheckArgs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_listeners: Option<Vec<NlbListener>>,
}

crate::impl_is_zero!(NlbConfig {
    main,
    healthcheck,
    additional_listeners,
});

crate::impl_merge!(NlbConfig { healthcheck, additional_listeners }, inline { main });

impl NlbConfig {
    /// Iterates over the main listener and the additional listeners.
    pub fn listeners(&self) -> impl Iterator<Item = &NlbListener> {
        std::iter::once(&self.main).chain(self.additional_listeners.iter().flatten())
    }
}

impl Validate for NlbConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if self.is_zero() {
            return;
        }
        validate::require(path, "port", self.main.port.is_some(), errors);
        self.main.validate_at(path, errors);
        self.healthcheck.validate_at(&path.child("healthcheck"), errors);
        if let Some(listeners) = &self.additional_listeners {
            let listeners_path = path.child("additional_listeners");
            for (i, listener) in listeners.iter().enumerate() {
                let listener_path = listeners_path.index(i);
                validate::require(&listener_path, "port", listener.port.is_some(), errors);
                listener.validate_at(&listener_path, errors);
            }
        }
    }
}

/// NlbListener is one port exposed by the network load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlbListener {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
}

crate::impl_is_zero!(NlbListener {
    port,
    target_container,
    target_port,
});

crate::impl_merge!(NlbListener {
    port,
    target_container,
    target_port,
});

impl Validate for NlbListener {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.port.validate_at(&path.child("port"), errors);
    }
}

/// NlbHealthCheckArgs configures network load balancer target health checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NlbHealthCheckArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<HumanDuration>,
}

crate::impl_merge!(NlbHealthCheckArgs {
    port,
    healthy_threshold,
    unhealthy_threshold,
    timeout,
    interval,
    grace_period,
});

impl Validate for NlbHealthCheckArgs {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate_thresholds(
            path,
            self.healthy_threshold,
            self.unhealthy_threshold,
            errors,
        );
        validate_timing(path, &self.timeout, &self.interval, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_http_or_bool() {
        let http: HttpOrBool = serde_yaml::from_str("false").unwrap();
        assert!(!http_enabled(&http));

        let http: HttpOrBool = serde_yaml::from_str("path: /api\nalias: example.com").unwrap();
        assert!(http_enabled(&http));
        let config = http.advanced().unwrap();
        assert_eq!(config.main.path.as_deref(), Some("/api"));
        assert_eq!(config.main.alias, Union::Basic("example.com".to_string()));

        assert!(http_enabled(&HttpOrBool::Unset));
    }

    #[test]
    fn test_health_check_forms() {
        let hc: HealthCheckArgsOrString = serde_yaml::from_str("/healthz").unwrap();
        assert_eq!(hc.path.as_deref(), Some("/healthz"));
        assert_eq!(hc.health_check_path(), Some("/healthz"));

        let hc: HealthCheckArgsOrString =
            serde_yaml::from_str("path: /ping\nhealthy_threshold: 3").unwrap();
        assert_eq!(hc.path, None);
        assert_eq!(hc.args.healthy_threshold, Some(3));
        assert_eq!(hc.health_check_path(), Some("/ping"));

        assert_eq!(serde_yaml::to_string(&hc).unwrap(), "path: /ping\nhealthy_threshold: 3\n");
    }

    #[test]
    fn test_additional_rules_need_path() {
        let http: HttpConfig = serde_yaml::from_str(
            "path: /\nadditional_rules:\n  - path: /admin\n  - alias: admin.example.com\n",
        )
        .unwrap();
        let errors = http.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.iter().next().unwrap().path().to_string(),
            "additional_rules[1]"
        );
    }

    #[test]
    fn test_main_rule_needs_path_once_configured() {
        let http: HttpConfig = serde_yaml::from_str("alias: example.com").unwrap();
        let errors = http.validate().unwrap_err();
        assert!(matches!(
            errors.iter().next().unwrap(),
            ValidationError::MissingConditionalField { field, trigger, .. }
                if field == "path" && trigger == "alias"
        ));
    }

    #[test]
    fn test_thresholds_and_timing() {
        let http: HttpConfig = serde_yaml::from_str(
            "path: /\nhealthcheck:\n  healthy_threshold: 1\n  unhealthy_threshold: 11\n  timeout: 10s\n  interval: 5s\n",
        )
        .unwrap();
        let errors = http.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "healthcheck.healthy_threshold",
                "healthcheck.unhealthy_threshold",
                "healthcheck",
            ]
        );
        assert!(errors.iter().last().unwrap().hint().is_some());
    }

    #[test]
    fn test_rule_formats() {
        let http: HttpConfig = serde_yaml::from_str(
            "path: /\nallowed_source_ips: [10.0.0.0/24, 10.0.1.0]\nprotocol_version: grpc\n",
        )
        .unwrap();
        let errors = http.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.iter().next().unwrap().path().to_string(),
            "allowed_source_ips[1]"
        );
    }

    #[test]
    fn test_nlb_requires_port() {
        let nlb: NlbConfig = serde_yaml::from_str("target_container: envoy").unwrap();
        assert_eq!(nlb.validate().unwrap_err().len(), 1);

        let nlb: NlbConfig = serde_yaml::from_str(
            "port: 443/tls\nadditional_listeners:\n  - port: 53/udp\n  - port: 8080/http\n",
        )
        .unwrap();
        let errors = nlb.validate().unwrap_err();
        assert_eq!(
            errors.iter().next().unwrap().path().to_string(),
            "additional_listeners[1].port"
        );
        assert_eq!(nlb.listeners().count(), 3);
    }
}
