//! Broadcaster configuration

use std::time::Duration;

use serde::Deserialize;

use crate::event::RetentionPolicy;

/// Queue capacity used when a subscriber does not ask for one
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Shortest trim interval accepted; `tokio::time::interval` rejects zero
pub const MIN_TRIM_INTERVAL: Duration = Duration::from_millis(1);

/// Broadcaster configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// Per-subscriber queue capacity for `join_default`
    pub default_queue_capacity: usize,

    /// Event log retention
    pub retention: RetentionPolicy,

    /// How often the background trim task runs
    pub trim_interval: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            default_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retention: RetentionPolicy::unbounded(),
            trim_interval: Duration::from_secs(60),
        }
    }
}

impl BroadcasterConfig {
    /// Set the default per-subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.default_queue_capacity = capacity.max(1);
        self
    }

    /// Keep at most `max` events in the log
    pub fn max_events(mut self, max: usize) -> Self {
        self.retention.max_events = Some(max);
        self
    }

    /// Evict events older than `age` on trim
    pub fn max_age(mut self, age: Duration) -> Self {
        self.retention.max_age = Some(age);
        self
    }

    /// Set the background trim interval (minimum [`MIN_TRIM_INTERVAL`])
    pub fn trim_interval(mut self, interval: Duration) -> Self {
        self.trim_interval = interval.max(MIN_TRIM_INTERVAL);
        self
    }

    /// Clamp values that bypassed the builders, e.g. from a config file
    pub(crate) fn normalized(mut self) -> Self {
        self.default_queue_capacity = self.default_queue_capacity.max(1);
        self.trim_interval = self.trim_interval.max(MIN_TRIM_INTERVAL);
        self
    }
}
