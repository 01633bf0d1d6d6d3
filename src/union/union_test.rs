//! Tests for union decode and encode.

#[cfg(test)]
mod tests {
    use crate::union::{DecodeError, StringOrStringSlice, Union};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct BuildArgs {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dockerfile: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        args: BTreeMap<String, String>,
    }

    crate::impl_is_zero!(BuildArgs { dockerfile, context, args });

    type BuildOrString = Union<String, BuildArgs>;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Scaling {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cooldown: Option<String>,
    }

    crate::impl_is_zero!(Scaling { value, cooldown });

    fn decode<T: serde::de::DeserializeOwned>(yaml: &str) -> Result<T, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_scalar_decodes_as_basic() {
        let u: StringOrStringSlice = decode("hello").unwrap();
        assert_eq!(u, Union::Basic("hello".to_string()));
    }

    #[test]
    fn test_sequence_decodes_as_advanced() {
        let u: StringOrStringSlice = decode(r#"["a", "b"]"#).unwrap();
        assert_eq!(u, Union::Advanced(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_empty_string_is_basic_not_unset() {
        let u: StringOrStringSlice = decode(r#""""#).unwrap();
        assert_eq!(u, Union::Basic(String::new()));
    }

    #[test]
    fn test_empty_sequence_is_advanced() {
        let u: StringOrStringSlice = decode("[]").unwrap();
        assert_eq!(u, Union::Advanced(vec![]));
    }

    #[test]
    fn test_null_is_unset() {
        let u: StringOrStringSlice = decode("~").unwrap();
        assert!(u.is_unset());
    }

    #[test]
    fn test_zero_scalar_is_basic() {
        let u: Union<u32, Scaling> = decode("0").unwrap();
        assert_eq!(u, Union::Basic(0));

        let u: Union<bool, Scaling> = decode("false").unwrap();
        assert_eq!(u, Union::Basic(false));
    }

    #[test]
    fn test_mapping_decodes_as_advanced() {
        let u: BuildOrString = decode("dockerfile: ./Dockerfile\ncontext: .").unwrap();
        assert_eq!(
            u,
            Union::Advanced(BuildArgs {
                dockerfile: Some("./Dockerfile".into()),
                context: Some(".".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_explicit_zero_in_mapping_is_not_empty() {
        let u: Union<u32, Scaling> = decode("value: 0").unwrap();
        assert_eq!(
            u,
            Union::Advanced(Scaling {
                value: Some(0),
                cooldown: None,
            })
        );
    }

    #[test]
    fn test_empty_mapping_is_unset() {
        let u: BuildOrString = decode("{}").unwrap();
        assert!(u.is_unset());
    }

    #[test]
    fn test_unknown_mapping_is_an_error_naming_both_shapes() {
        let err = decode::<BuildOrString>("registry: example.com").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("String"), "{}", msg);
        assert!(msg.contains("BuildArgs"), "{}", msg);
    }

    #[test]
    fn test_scalar_matching_neither_shape_is_an_error() {
        let raw = serde_yaml::Value::String("many".into());
        let err = Union::<u32, Scaling>::decode(raw).unwrap_err();
        assert!(matches!(err, DecodeError::Ambiguity { shape: "scalar", .. }));
    }

    #[test]
    fn test_encode_emits_only_the_populated_shape() {
        let u: BuildOrString = Union::from_basic("public.ecr.aws/nginx".into());
        assert_eq!(serde_yaml::to_string(&u).unwrap(), "public.ecr.aws/nginx\n");

        let u: BuildOrString = Union::from_advanced(BuildArgs {
            dockerfile: Some("Dockerfile".into()),
            ..Default::default()
        });
        assert_eq!(serde_yaml::to_string(&u).unwrap(), "dockerfile: Dockerfile\n");

        let u: BuildOrString = Union::Unset;
        assert_eq!(serde_yaml::to_string(&u).unwrap(), "null\n");
    }

    #[test]
    fn test_round_trip() {
        let values: Vec<StringOrStringSlice> = vec![
            Union::from_basic("hello".into()),
            Union::from_basic(String::new()),
            Union::from_advanced(vec!["a".into(), "b".into()]),
            Union::from_advanced(vec![]),
        ];
        for v in values {
            let encoded = serde_yaml::to_string(&v).unwrap();
            let decoded: StringOrStringSlice = serde_yaml::from_str(&encoded).unwrap();
            assert_eq!(decoded, v, "round trip of {}", encoded);
        }

        let v: Union<u32, Scaling> = Union::from_advanced(Scaling {
            value: Some(50),
            cooldown: Some("30s".into()),
        });
        let encoded = serde_yaml::to_string(&v).unwrap();
        assert_eq!(serde_yaml::from_str::<Union<u32, Scaling>>(&encoded).unwrap(), v);
    }

    #[test]
    fn test_union_as_struct_field() {
        #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
        struct Image {
            #[serde(default, skip_serializing_if = "Union::is_unset")]
            build: BuildOrString,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            location: Option<String>,
        }

        let image: Image = decode("location: nginx").unwrap();
        assert!(image.build.is_unset());

        let image: Image = decode("build: ./Dockerfile").unwrap();
        assert_eq!(image.build, Union::Basic("./Dockerfile".into()));
        assert_eq!(serde_yaml::to_string(&image).unwrap(), "build: ./Dockerfile\n");
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct PathRule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    }

    crate::impl_is_zero!(PathRule { path });

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct AliasRule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    }

    crate::impl_is_zero!(AliasRule { alias });

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Rule {
        name: String,
        #[serde(flatten)]
        target: Union<PathRule, AliasRule>,
    }

    #[test]
    fn test_inlined_union_decodes_leftover_keys() {
        let rule: Rule = decode("name: api\npath: /api").unwrap();
        assert_eq!(
            rule.target,
            Union::Basic(PathRule {
                path: Some("/api".into())
            })
        );

        let rule: Rule = decode("name: api\nalias: api.example.com").unwrap();
        assert_eq!(
            rule.target,
            Union::Advanced(AliasRule {
                alias: Some("api.example.com".into())
            })
        );
    }

    #[test]
    fn test_inlined_union_round_trip() {
        let rule = Rule {
            name: "api".into(),
            target: Union::from_advanced(AliasRule {
                alias: Some("example.com".into()),
            }),
        };
        let encoded = serde_yaml::to_string(&rule).unwrap();
        assert_eq!(encoded, "name: api\nalias: example.com\n");
        assert_eq!(serde_yaml::from_str::<Rule>(&encoded).unwrap(), rule);
    }
}
