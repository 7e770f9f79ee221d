//! # Generation Errors

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for token producers
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Why a generation session ended without a complete document.
///
/// The display text is what readers see in the terminal error fragment.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to start generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Generator I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Generator exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation failed: {0}")]
    Producer(String),
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "NBSTREAM_GEN_SPAWN",
            Self::Io(_) => "NBSTREAM_GEN_IO",
            Self::ExitStatus { .. } => "NBSTREAM_GEN_EXIT_STATUS",
            Self::Timeout(_) => "NBSTREAM_GEN_TIMEOUT",
            Self::Producer(_) => "NBSTREAM_GEN_PRODUCER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_message_carries_stderr() {
        let err = GenerationError::ExitStatus {
            code: Some(2),
            stderr: "quota exceeded".to_string(),
        };
        assert_eq!(err.code(), "NBSTREAM_GEN_EXIT_STATUS");
        assert!(err.to_string().contains("quota exceeded"));
    }
}
