//! Task count and autoscaling settings.

use super::types::HumanDuration;
use crate::fieldpath::Path;
use crate::merge::{Merge, MergeError};
use crate::union::{IsZero, Union};
use crate::validate::{self, Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};

/// Count is the number of tasks: a fixed `value`, or an `advanced_count`
/// with spot capacity or an autoscaling policy.
///
/// Authored as either `count: 3` or `count: {range: 1-10, cpu_percentage: 70}`;
/// both sides live on the struct so environment overrides can clear the one
/// that was not chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Union<u32, AdvancedCount>", into = "Union<u32, AdvancedCount>")]
pub struct Count {
    pub value: Option<u32>,
    pub advanced_count: AdvancedCount,
}

impl From<Union<u32, AdvancedCount>> for Count {
    fn from(u: Union<u32, AdvancedCount>) -> Self {
        match u {
            Union::Unset => Count::default(),
            Union::Basic(value) => Count {
                value: Some(value),
                ..Default::default()
            },
            Union::Advanced(advanced_count) => Count {
                value: None,
                advanced_count,
            },
        }
    }
}

impl From<Count> for Union<u32, AdvancedCount> {
    fn from(count: Count) -> Self {
        match count.value {
            Some(value) => Union::Basic(value),
            None if count.advanced_count.is_zero() => Union::Unset,
            None => Union::Advanced(count.advanced_count),
        }
    }
}

crate::impl_is_zero!(Count { value, advanced_count });

crate::impl_merge!(Count {}, inline { value, advanced_count });

impl Count {
    /// Creates a fixed count.
    pub fn fixed(value: u32) -> Self {
        Count {
            value: Some(value),
            ..Default::default()
        }
    }

    /// Returns the number of tasks to start with: the fixed value, else the
    /// lower bound of the autoscaling range, else the spot count.
    pub fn desired(&self) -> Option<u32> {
        if let Some(value) = self.value {
            return Some(value);
        }
        if let Some((min, _)) = self.advanced_count.range.bounds() {
            return Some(min);
        }
        self.advanced_count.spot
    }

    /// Returns true if an autoscaling policy is configured.
    pub fn has_autoscaling(&self) -> bool {
        self.value.is_none() && self.advanced_count.has_autoscaling_fields()
    }
}

impl Validate for Count {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        self.advanced_count.validate_at(path, errors);
    }
}

/// AdvancedCount configures spot capacity or autoscaling. `spot` is exclusive
/// with the autoscaling fields, and the autoscaling fields need a `range`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedCount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot: Option<u32>,
    #[serde(default, skip_serializing_if = "Range::is_zero")]
    pub range: Range,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub cpu_percentage: ScalingConfigOrT<u32>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub memory_percentage: ScalingConfigOrT<u32>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub requests: ScalingConfigOrT<u32>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub response_time: ScalingConfigOrT<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<Cooldown>,
}

crate::impl_is_zero!(AdvancedCount {
    spot,
    range,
    cpu_percentage,
    memory_percentage,
    requests,
    response_time,
    cooldown,
});

crate::impl_merge!(AdvancedCount {
    spot,
    range,
    cpu_percentage,
    memory_percentage,
    requests,
    response_time,
    cooldown,
});

/// Autoscaling fields, in the order they are reported.
pub const AUTOSCALING_FIELDS: &[&str] = &[
    "range",
    "cpu_percentage",
    "memory_percentage",
    "requests",
    "response_time",
];

impl AdvancedCount {
    fn scaling_fields(&self) -> [(&'static str, bool); 4] {
        [
            ("cpu_percentage", !self.cpu_percentage.is_unset()),
            ("memory_percentage", !self.memory_percentage.is_unset()),
            ("requests", !self.requests.is_unset()),
            ("response_time", !self.response_time.is_unset()),
        ]
    }

    /// Returns true if any autoscaling metric is configured.
    pub fn has_autoscaling_fields(&self) -> bool {
        self.scaling_fields().iter().any(|(_, set)| *set)
    }

    /// Returns true if any field of the autoscaling group, range included, is set.
    pub fn has_autoscaling_group(&self) -> bool {
        !self.range.is_zero() || self.has_autoscaling_fields()
    }
}

impl Validate for AdvancedCount {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);

        let fields = self.scaling_fields();
        if let Some((trigger, _)) = fields.iter().find(|(_, set)| *set) {
            validate::require_if(path, (*trigger, true), ("range", !self.range.is_zero()), errors);
        }
        if !self.range.is_zero() {
            validate::require_one_of(path, &fields, errors);
        }

        self.range.validate_at(&path.child("range"), errors);
        self.cpu_percentage.validate_at(&path.child("cpu_percentage"), errors);
        self.memory_percentage.validate_at(&path.child("memory_percentage"), errors);
        self.requests.validate_at(&path.child("requests"), errors);
        self.response_time.validate_at(&path.child("response_time"), errors);
        for (name, scaling) in [
            ("cpu_percentage", &self.cpu_percentage),
            ("memory_percentage", &self.memory_percentage),
        ] {
            if let Some(value) = scaling_value(scaling) {
                validate::percentage(&path.child(name), value, errors);
            }
        }
        if let Some(value) = scaling_value(&self.requests) {
            if value == 0 {
                errors.add(ValidationError::invalid_range(
                    path.child("requests"),
                    "requests per task must be greater than 0",
                ));
            }
        }
        if let Some(value) = scaling_value(&self.response_time) {
            validate::positive_duration(&path.child("response_time"), Some(value.0), errors);
        }
    }
}

/// Returns the target value of a scaling policy in either shape.
pub fn scaling_value<T: Copy>(scaling: &ScalingConfigOrT<T>) -> Option<T> {
    match scaling {
        Union::Unset => None,
        Union::Basic(value) => Some(*value),
        Union::Advanced(advanced) => advanced.value,
    }
}

/// ScalingConfigOrT is a scaling target given as a bare value or with a cooldown.
pub type ScalingConfigOrT<T> = Union<T, AdvancedScalingConfig<T>>;

/// AdvancedScalingConfig is a scaling target with its own cooldown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedScalingConfig<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<Cooldown>,
}

impl<T> IsZero for AdvancedScalingConfig<T> {
    fn is_zero(&self) -> bool {
        self.value.is_none() && self.cooldown.is_none()
    }
}

impl<T: Merge> Merge for AdvancedScalingConfig<T> {
    fn merge_at(&mut self, overlay: Self, path: &Path) -> Result<(), MergeError> {
        self.value.merge_at(overlay.value, &path.child("value"))?;
        self.cooldown.merge_at(overlay.cooldown, &path.child("cooldown"))
    }
}

impl<T> Validate for AdvancedScalingConfig<T> {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "value", self.value.is_some(), errors);
    }
}

/// Cooldown is how long to wait between scaling activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_in: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_out: Option<HumanDuration>,
}

crate::impl_is_zero!(Cooldown { scale_in, scale_out });

crate::impl_merge!(Cooldown { scale_in, scale_out });

/// Range is the autoscaling task range: `1-10`, or a `min`/`max` object that
/// can also say from which task count spot capacity is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Union<String, RangeConfig>", into = "Union<String, RangeConfig>")]
pub struct Range {
    pub value: Option<String>,
    pub range_config: RangeConfig,
}

impl From<Union<String, RangeConfig>> for Range {
    fn from(u: Union<String, RangeConfig>) -> Self {
        match u {
            Union::Unset => Range::default(),
            Union::Basic(value) => Range {
                value: Some(value),
                ..Default::default()
            },
            Union::Advanced(range_config) => Range {
                value: None,
                range_config,
            },
        }
    }
}

impl From<Range> for Union<String, RangeConfig> {
    fn from(range: Range) -> Self {
        match range.value {
            Some(value) => Union::Basic(value),
            None if range.range_config.is_zero() => Union::Unset,
            None => Union::Advanced(range.range_config),
        }
    }
}

crate::impl_is_zero!(Range { value, range_config });

crate::impl_merge!(Range {}, inline { value, range_config });

impl Range {
    /// Returns `(min, max)` from whichever form is set and well formed.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        if let Some(value) = &self.value {
            return parse_range_band(value).ok();
        }
        match (self.range_config.min, self.range_config.max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// Parses a range band such as `1-10`.
pub fn parse_range_band(s: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("range \"{}\" must be of the form \"<min>-<max>\"", s);
    let (min, max) = s.split_once('-').ok_or_else(invalid)?;
    let min = min.trim().parse::<u32>().map_err(|_| invalid())?;
    let max = max.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((min, max))
}

impl Validate for Range {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        crate::exclusive::check(self, path, errors);
        if let Some(value) = &self.value {
            match parse_range_band(value) {
                Ok((min, max)) => validate::min_le_max(path, ("min", min), ("max", max), errors),
                Err(message) => errors.add(
                    ValidationError::invalid_format(path.clone(), message).with_hint("for example \"1-10\""),
                ),
            }
        }
        if !self.range_config.is_zero() {
            self.range_config.validate_at(path, errors);
        }
    }
}

/// RangeConfig is the object form of a range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_from: Option<u32>,
}

crate::impl_is_zero!(RangeConfig { min, max, spot_from });

crate::impl_merge!(RangeConfig { min, max, spot_from });

impl Validate for RangeConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "min", self.min.is_some(), errors);
        validate::require(path, "max", self.max.is_some(), errors);
        if let (Some(min), Some(max)) = (self.min, self.max) {
            validate::min_le_max(path, ("min", min), ("max", max), errors);
        }
        if let (Some(spot_from), Some(max)) = (self.spot_from, self.max) {
            validate::min_le_max(path, ("spot_from", spot_from), ("max", max), errors);
        }
    }
}
