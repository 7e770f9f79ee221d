//! Generation sessions
//!
//! A session pipes one token producer into one [`crate::writer::NotebookWriter`]
//! and freezes the document when the producer ends, fails, or times out.
//! The [`SessionRegistry`] keeps sessions unique per key.

mod config;
mod errors;
mod registry;
mod source;

pub use config::GenerationConfig;
pub use errors::{GenerationError, GenerationResult};
pub use registry::{SessionDecision, SessionInfo, SessionRegistry, SessionState};
pub use source::{CommandTokenSource, TokenSource};
