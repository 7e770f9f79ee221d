//! Fragment streamer configuration
//!
//! The streamer polls because the snapshot store offers no change
//! notification. Every wait it performs is bounded by one of these.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll loop timing and fragment selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sleep between polls (default: 250ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a missing raw snapshot is waited for (default: 10s)
    #[serde(default = "default_grace_window_ms")]
    pub grace_window_ms: u64,

    /// Sleep between polls while the raw snapshot is missing (default: 1s)
    #[serde(default = "default_missing_backoff_ms")]
    pub missing_backoff_ms: u64,

    /// Time without snapshot change or delivery after which the document
    /// is treated as complete (default: 30s)
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: u64,

    /// Hard cap on polls per stream (default: 2400)
    #[serde(default = "default_iteration_cap")]
    pub iteration_cap: u32,

    /// Element name of one fragment in rendered markup (default: "div")
    #[serde(default = "default_fragment_tag")]
    pub fragment_tag: String,

    /// Fragments buffered between streamer and client (default: 16)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_grace_window_ms() -> u64 {
    10_000
}

fn default_missing_backoff_ms() -> u64 {
    1_000
}

fn default_staleness_threshold_ms() -> u64 {
    30_000
}

fn default_iteration_cap() -> u32 {
    2_400
}

fn default_fragment_tag() -> String {
    "div".to_string()
}

fn default_channel_capacity() -> usize {
    16
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            grace_window_ms: default_grace_window_ms(),
            missing_backoff_ms: default_missing_backoff_ms(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
            iteration_cap: default_iteration_cap(),
            fragment_tag: default_fragment_tag(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    pub fn missing_backoff(&self) -> Duration {
        Duration::from_millis(self.missing_backoff_ms)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }
}
