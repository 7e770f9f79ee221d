//! Progressive fragment streaming
//!
//! Turns a session's evolving snapshot into one append-only HTML
//! response: preamble, settled fragments in order, then the terminator.
//!
//! The store is the only channel between producer and streamer, so
//! completion is read from it: a non-empty `Final` artifact, a definite
//! repair of `Raw`, or a snapshot that has stopped changing for the
//! staleness threshold.

mod config;
mod errors;
mod state;
mod streamer;

pub use config::StreamConfig;
pub use errors::{StreamError, StreamResult};
pub use state::{Advance, Observation, StreamState, TERMINATOR};
pub use streamer::{FragmentStreamer, GenerationTrigger, StreamOutcome, StreamRequest};
