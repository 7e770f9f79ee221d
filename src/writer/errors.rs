//! # Writer Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Incremental writer errors. Chunk persistence failures are logged, not
/// returned; only lifecycle misuse and the final write surface here.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Writer for {0} already finished")]
    AlreadyFinished(String),

    #[error("Failed to persist final snapshot: {0}")]
    Store(#[from] StoreError),
}
