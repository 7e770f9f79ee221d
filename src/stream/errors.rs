//! # Stream Errors

use thiserror::Error;

use crate::render::RenderError;
use crate::store::StoreError;

/// Result type for a single poll
pub type StreamResult<T> = Result<T, StreamError>;

/// Failures of one poll. None of them end a stream; the next tick retries.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Snapshot read failed: {0}")]
    Store(#[from] StoreError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Poll task failed: {0}")]
    Task(String),
}
