//! # Render Errors

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Markup renderer errors. All of them are transient from the point of
/// view of a stream: the next poll tries again.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to start renderer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Renderer exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Renderer produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("Invalid fragment tag: {0}")]
    InvalidTag(String),
}

impl RenderError {
    /// Stable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::Io(_) => "NBSTREAM_RENDER_IO",
            RenderError::Spawn { .. } => "NBSTREAM_RENDER_SPAWN",
            RenderError::Failed { .. } => "NBSTREAM_RENDER_FAILED",
            RenderError::Timeout(_) => "NBSTREAM_RENDER_TIMEOUT",
            RenderError::MissingOutput(_) => "NBSTREAM_RENDER_MISSING_OUTPUT",
            RenderError::InvalidTag(_) => "NBSTREAM_RENDER_INVALID_TAG",
        }
    }
}
