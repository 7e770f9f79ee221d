//! Application configuration
//!
//! One JSON file with a section per subsystem. Every field has a default,
//! so an empty object (or no file at all) is a valid configuration.
//!
//! ```json
//! {
//!   "data_dir": "generated",
//!   "http": { "port": 8080 },
//!   "generation": { "command": "./generate.sh", "prefill": "{" },
//!   "stream": { "poll_interval_ms": 250 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::{CliError, CliResult};
use crate::generation::GenerationConfig;
use crate::http_server::HttpServerConfig;
use crate::observability::DEFAULT_LOG_FILTER;
use crate::render::RendererConfig;
use crate::stream::StreamConfig;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding session artifacts (default: "generated")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub renderer: RendererConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_filter: default_log_filter(),
            http: HttpServerConfig::default(),
            stream: StreamConfig::default(),
            generation: GenerationConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` when given, else use defaults.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.stream.poll_interval_ms == 0 {
            return Err(CliError::config_error("stream.poll_interval_ms must be > 0"));
        }
        if self.stream.iteration_cap == 0 {
            return Err(CliError::config_error("stream.iteration_cap must be > 0"));
        }
        if self.generation.command.trim().is_empty() {
            return Err(CliError::config_error("generation.command must not be empty"));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(CliError::config_error("renderer.program must not be empty"));
        }
        Ok(())
    }
}
