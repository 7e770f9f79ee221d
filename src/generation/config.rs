//! Generation session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token producer command and session limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Program that writes notebook JSON to stdout for the locator given
    /// as its last argument (default: "nbstream-generate")
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the locator
    #[serde(default)]
    pub args: Vec<String>,

    /// Text the producer was primed with and will not repeat (default: "")
    #[serde(default)]
    pub prefill: String,

    /// Seconds before a running producer is abandoned (default: 600)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds a finished notebook is replayed instead of regenerated
    /// (default: 3600)
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,

    /// Chunks buffered between producer and writer (default: 64)
    #[serde(default = "default_chunk_buffer")]
    pub chunk_buffer: usize,
}

fn default_command() -> String {
    "nbstream-generate".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_freshness_window_secs() -> u64 {
    3_600
}

fn default_chunk_buffer() -> usize {
    64
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            prefill: String::new(),
            timeout_secs: default_timeout_secs(),
            freshness_window_secs: default_freshness_window_secs(),
            chunk_buffer: default_chunk_buffer(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }
}
