//! Simulator configuration

use std::time::Duration;

use serde::Deserialize;

/// Synthetic producer options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Wait before the first generated event
    pub initial_delay: Duration,

    /// Shortest pause between events
    pub min_interval: Duration,

    /// Longest pause between events
    pub max_interval: Duration,

    /// Chance of replaying one of the canned worker events instead of
    /// generating a fresh one
    pub canned_ratio: f64,

    /// Stop after this many events (0 = run until cancelled)
    pub max_events: u64,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

/// Default chance of replaying a canned event
pub const DEFAULT_CANNED_RATIO: f64 = 0.5;

/// Clamp a probability to `0.0..=1.0`, mapping NaN and infinities to the default
pub fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        DEFAULT_CANNED_RATIO
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(4),
            canned_ratio: DEFAULT_CANNED_RATIO,
            max_events: 0,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Set the initial delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the pause range; bounds are swapped if given in the wrong order
    pub fn interval(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min.min(max);
        self.max_interval = min.max(max);
        self
    }

    /// Set the canned event ratio, clamped to `0.0..=1.0`
    ///
    /// A non-finite ratio falls back to the default.
    pub fn canned_ratio(mut self, ratio: f64) -> Self {
        self.canned_ratio = sanitize_ratio(ratio);
        self
    }

    /// Stop after `count` events
    pub fn max_events(mut self, count: u64) -> Self {
        self.max_events = count;
        self
    }

    /// Use a fixed RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
