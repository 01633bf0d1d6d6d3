//! Tests for environment override merges over the manifest catalog.

#[cfg(test)]
mod tests {
    use crate::fieldpath::Path;
    use crate::manifest::{
        AdvancedCount, BackendServiceConfig, Count, DockerBuildArgs, HealthCheckArgsOrString,
        Image, LoadBalancedWebServiceConfig, Range, RangeConfig,
    };
    use crate::merge::{merge, merge_at, MergeError};
    use crate::union::Union;
    use pretty_assertions::assert_eq;

    /// Helper to decode a service config from YAML.
    fn svc(yaml: &str) -> LoadBalancedWebServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn backend(yaml: &str) -> BackendServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const BASE: &str = r#"
image:
  build: ./api
  port: 8080
cpu: 256
memory: 512
count:
  range: 1-10
  cpu_percentage: 70
variables:
  LOG_LEVEL: info
  REGION: us-west-2
http:
  path: /
  healthcheck: /healthz
sidecars:
  nginx:
    image: nginx
    port: 80
"#;

    #[test]
    fn test_fixed_count_replaces_autoscaling() {
        let merged = merge(svc(BASE), svc("count: 5")).unwrap();
        assert_eq!(merged.task.count, Count::fixed(5));
        assert_eq!(merged.task.count.advanced_count, AdvancedCount::default());
        assert_eq!(merged.task.cpu, Some(256));
    }

    #[test]
    fn test_autoscaling_replaces_fixed_count() {
        let base = svc("count: 2");
        let merged = merge(base, svc("count:\n  range: 2-4\n  requests: 100")).unwrap();
        assert_eq!(merged.task.count.value, None);
        assert_eq!(merged.task.count.advanced_count.range.value.as_deref(), Some("2-4"));
        assert_eq!(merged.task.count.advanced_count.requests, Union::Basic(100));
    }

    #[test]
    fn test_spot_replaces_fixed_count() {
        let merged = merge(svc("count: 3"), svc("count:\n  spot: 5")).unwrap();
        assert_eq!(merged.task.count.value, None);
        assert_eq!(merged.task.count.advanced_count.spot, Some(5));
        assert!(!merged.task.count.advanced_count.has_autoscaling_group());
    }

    #[test]
    fn test_spot_clears_autoscaling_group() {
        let merged = merge(svc(BASE), svc("count:\n  spot: 3")).unwrap();
        let advanced = &merged.task.count.advanced_count;
        assert_eq!(advanced.spot, Some(3));
        assert_eq!(advanced.range, Range::default());
        assert!(advanced.cpu_percentage.is_unset());
    }

    #[test]
    fn test_metric_override_keeps_range() {
        let merged = merge(svc(BASE), svc("count:\n  cpu_percentage: 50")).unwrap();
        let advanced = &merged.task.count.advanced_count;
        assert_eq!(advanced.range.value.as_deref(), Some("1-10"));
        assert_eq!(advanced.cpu_percentage, Union::Basic(50));
    }

    #[test]
    fn test_nested_range_forms_are_exclusive() {
        let merged = merge(svc(BASE), svc("count:\n  range:\n    min: 2\n    max: 6\n    spot_from: 4")).unwrap();
        let range = &merged.task.count.advanced_count.range;
        assert_eq!(range.value, None);
        assert_eq!(
            range.range_config,
            RangeConfig {
                min: Some(2),
                max: Some(6),
                spot_from: Some(4),
            }
        );
        assert_eq!(merged.task.count.advanced_count.cpu_percentage, Union::Basic(70));
    }

    #[test]
    fn test_location_replaces_build() {
        let merged = merge(svc(BASE), svc("image:\n  location: example.com/api:1.2")).unwrap();
        assert!(merged.image.build.is_unset());
        assert_eq!(merged.image.location.as_deref(), Some("example.com/api:1.2"));
        assert_eq!(merged.image.port, svc(BASE).image.port);
    }

    #[test]
    fn test_build_form_switch() {
        let merged = merge(svc(BASE), svc("image:\n  build:\n    dockerfile: api/Dockerfile.prod")).unwrap();
        let args = merged.image.build.advanced().unwrap();
        assert_eq!(args.dockerfile.as_deref(), Some("api/Dockerfile.prod"));
        assert_eq!(args.context, None);
    }

    #[test]
    fn test_health_check_forms_are_exclusive() {
        let merged = merge(svc(BASE), svc("http:\n  healthcheck:\n    path: /ping\n    interval: 15s")).unwrap();
        let hc: &HealthCheckArgsOrString = &merged.http.advanced().unwrap().main.healthcheck;
        assert_eq!(hc.path, None);
        assert_eq!(hc.args.path.as_deref(), Some("/ping"));
        assert_eq!(merged.http.advanced().unwrap().main.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_override_setting_both_sides_fails() {
        let overlay = svc("image:\n  build: ./other\n  location: nginx");
        let err = merge_at(svc(BASE), overlay, &Path::new().child("environments").key("prod"))
            .unwrap_err();
        let MergeError::ExclusiveFieldConflict { path, first, second } = &err;
        assert_eq!(path.to_string(), "environments[prod].image");
        assert_eq!(first, "\"build\"");
        assert_eq!(second, "\"location\"");
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_nested_conflict_path() {
        let overlay = svc("count:\n  spot: 2\n  requests: 10");
        let err = merge(svc(BASE), overlay).unwrap_err();
        assert_eq!(err.path().to_string(), "count");
        assert!(err.to_string().contains("\"spot\""));
    }

    #[test]
    fn test_empty_override_is_identity() {
        assert_eq!(merge(svc(BASE), svc("{}")).unwrap(), svc(BASE));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let overlay = svc("count: 4\nvariables:\n  LOG_LEVEL: debug\n");
        let once = merge(svc(BASE), overlay.clone()).unwrap();
        let twice = merge(once.clone(), overlay).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_maps_merge_key_wise() {
        let merged = merge(
            svc(BASE),
            svc("variables:\n  LOG_LEVEL: debug\n  FEATURE: on\nsidecars:\n  nginx:\n    port: 8081\n  xray:\n    image: xray\n"),
        )
        .unwrap();
        assert_eq!(merged.task.variables["LOG_LEVEL"], "debug");
        assert_eq!(merged.task.variables["REGION"], "us-west-2");
        assert_eq!(merged.task.variables["FEATURE"], "on");
        let nginx = &merged.sidecars["nginx"];
        assert_eq!(nginx.image.as_deref(), Some("nginx"));
        assert_eq!(nginx.port.as_ref().map(|p| p.as_str()), Some("8081"));
        assert!(merged.sidecars.contains_key("xray"));
    }

    #[test]
    fn test_lists_are_replaced() {
        let base = svc("http:\n  path: /\n  allowed_source_ips: [10.0.0.0/24, 10.0.1.0/24]");
        let merged = merge(base.clone(), svc("http:\n  allowed_source_ips: [192.168.0.0/16]")).unwrap();
        assert_eq!(
            merged.http.advanced().unwrap().main.allowed_source_ips,
            Some(vec!["192.168.0.0/16".to_string()])
        );

        let merged = merge(base, svc("http:\n  allowed_source_ips: []")).unwrap();
        assert_eq!(merged.http.advanced().unwrap().main.allowed_source_ips, Some(vec![]));
    }

    #[test]
    fn test_explicit_false_and_zero_win() {
        let base = backend("image:\n  location: nginx\nexec: true\ncpu: 512\n");
        let merged = merge(base, backend("exec: false\ncount: 0\n")).unwrap();
        assert_eq!(merged.task.exec, Some(false));
        assert_eq!(merged.task.count, Count::fixed(0));
        assert_eq!(merged.task.cpu, Some(512));
    }

    #[test]
    fn test_http_can_be_disabled() {
        let merged = merge(svc(BASE), svc("http: false")).unwrap();
        assert_eq!(merged.http, Union::Basic(false));
    }

    #[test]
    fn test_image_merge_is_depth_first() {
        let base = Image {
            location: Some("nginx".into()),
            ..Default::default()
        };
        let overlay: Image = serde_yaml::from_str("build: ./web\nhealthcheck:\n  retries: 3").unwrap();
        let merged = merge(base, overlay).unwrap();
        assert_eq!(merged.location, None);
        assert_eq!(merged.build, Union::Basic("./web".to_string()));
        assert_eq!(merged.healthcheck.unwrap().retries, Some(3));
    }

    #[test]
    fn test_build_args_replace_location() {
        let base: Image = serde_yaml::from_str("location: a/b\nport: 80").unwrap();
        let overlay: Image = serde_yaml::from_str("build:\n  dockerfile: ./Dockerfile").unwrap();
        let merged = merge(base, overlay).unwrap();
        assert_eq!(merged.location, None);
        assert_eq!(
            merged.build,
            Union::Advanced(DockerBuildArgs {
                dockerfile: Some("./Dockerfile".into()),
                ..Default::default()
            })
        );
        assert_eq!(merged.port.as_ref().map(|p| p.as_str()), Some("80"));
    }
}
