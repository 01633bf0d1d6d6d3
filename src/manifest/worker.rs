//! Worker service subscriptions and queues.

use super::types::{std_duration, HumanDuration};
use crate::fieldpath::Path;
use crate::union::{IsZero, Union};
use crate::validate::{self, Validate, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SubscribeConfig lists the topics a worker consumes and its shared queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<TopicSubscription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<SqsQueue>,
}

crate::impl_merge!(SubscribeConfig { topics, queue });

impl Validate for SubscribeConfig {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        self.topics.validate_at(&path.child("topics"), errors);
        self.queue.validate_at(&path.child("queue"), errors);
    }
}

/// TopicSubscription subscribes to a topic published by another service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Union::is_unset")]
    pub queue: SqsQueueOrBool,
}

crate::impl_merge!(TopicSubscription {
    name,
    service,
    queue,
});

impl Validate for TopicSubscription {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        validate::require(path, "name", self.name.is_some(), errors);
        validate::require(path, "service", self.service.is_some(), errors);
        self.queue.validate_at(&path.child("queue"), errors);
    }
}

/// SqsQueueOrBool is `queue: true` for a dedicated queue with defaults, or
/// its settings.
pub type SqsQueueOrBool = Union<bool, SqsQueue>;

/// SqsQueue configures a message queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqsQueue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<HumanDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter: Option<DeadLetterQueue>,
}

crate::impl_is_zero!(SqsQueue {
    retention_period,
    delay,
    timeout,
    dead_letter,
});

crate::impl_merge!(SqsQueue {
    retention_period,
    delay,
    timeout,
    dead_letter,
});

/// Message retention bounds.
pub const RETENTION_RANGE: (Duration, Duration) =
    (Duration::from_secs(60), Duration::from_secs(14 * 24 * 60 * 60));
/// Delivery delay bounds.
pub const DELAY_RANGE: (Duration, Duration) = (Duration::ZERO, Duration::from_secs(15 * 60));
/// Visibility timeout bounds.
pub const TIMEOUT_RANGE: (Duration, Duration) = (Duration::ZERO, Duration::from_secs(12 * 60 * 60));

impl Validate for SqsQueue {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        for (name, value, (lo, hi)) in [
            ("retention_period", &self.retention_period, RETENTION_RANGE),
            ("delay", &self.delay, DELAY_RANGE),
            ("timeout", &self.timeout, TIMEOUT_RANGE),
        ] {
            validate::duration_within(&path.child(name), std_duration(value), lo, hi, errors);
        }
        self.dead_letter.validate_at(&path.child("dead_letter"), errors);
    }
}

/// DeadLetterQueue moves messages aside after repeated failed deliveries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterQueue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tries: Option<u32>,
}

crate::impl_merge!(DeadLetterQueue { tries });

impl Validate for DeadLetterQueue {
    fn validate_at(&self, path: &Path, errors: &mut ValidationErrors) {
        if let Some(tries) = self.tries {
            validate::within(&path.child("tries"), tries, 1, 1000, errors);
        }
    }
}

impl DeadLetterQueue {
    /// Returns true if a dead letter queue is requested.
    pub fn is_enabled(&self) -> bool {
        !self.tries.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_queue_forms() {
        let subscribe: SubscribeConfig = serde_yaml::from_str(
            "topics:\n  - name: orders\n    service: api\n    queue: true\n  - name: events\n    service: api\n    queue:\n      retention_period: 4d\n",
        )
        .unwrap();
        let topics = subscribe.topics.as_ref().unwrap();
        assert_eq!(topics[0].queue, Union::Basic(true));
        assert!(topics[1].queue.is_advanced());
        assert!(subscribe.validate().is_ok());
    }

    #[test]
    fn test_queue_bounds() {
        let subscribe: SubscribeConfig = serde_yaml::from_str(
            "queue:\n  retention_period: 30s\n  delay: 20m\n  dead_letter:\n    tries: 0\ntopics:\n  - name: orders\n",
        )
        .unwrap();
        let errors = subscribe.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "topics[0]",
                "queue.retention_period",
                "queue.delay",
                "queue.dead_letter.tries",
            ]
        );
    }

    #[test]
    fn test_dead_letter_enabled() {
        assert!(DeadLetterQueue { tries: Some(3) }.is_enabled());
        assert!(!DeadLetterQueue::default().is_enabled());
    }
}
