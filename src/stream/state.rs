//! Per-stream delivery state
//!
//! Decides, for each poll, which fragments are safe to send. Kept free of
//! I/O and clocks (callers pass `now`) so the policy can be driven
//! directly.
//!
//! # Policy
//!
//! - While the document is incomplete its last fragment is withheld: the
//!   newest cell may still change
//! - Fragments are sent in order, each index at most once
//! - The preamble precedes the first fragment and is sent once
//! - Completion sends the failure fragment (if any) and the terminator,
//!   once, and ends the stream

use std::time::{Duration, Instant, SystemTime};

use crate::render::error_fragment;

/// Closes the page opened by the preamble.
pub const TERMINATOR: &str = "</main></body></html>";

/// What one poll saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// Rendered markup before the first fragment.
    pub preamble: String,
    /// Every fragment of the current render, in order.
    pub fragments: Vec<String>,
    /// The document will not change any more.
    pub complete: bool,
    /// Producer failure to report before the terminator.
    pub failure: Option<String>,
}

/// Output of one [`StreamState::advance`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advance {
    /// Markup to deliver, in order.
    pub chunks: Vec<String>,
    /// The terminator has been delivered.
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct StreamState {
    emitted: usize,
    preamble_sent: bool,
    force_complete: bool,
    finished: bool,
    last_modified: Option<SystemTime>,
    last_activity: Instant,
    staleness_threshold: Duration,
}

impl StreamState {
    pub fn new(staleness_threshold: Duration, now: Instant) -> Self {
        Self {
            emitted: 0,
            preamble_sent: false,
            force_complete: false,
            finished: false,
            last_modified: None,
            last_activity: now,
            staleness_threshold,
        }
    }

    /// Fragments delivered so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Completion has been inferred from staleness.
    pub fn is_forced_complete(&self) -> bool {
        self.force_complete
    }

    /// Apply one observation.
    pub fn advance(&mut self, observation: Observation, now: Instant) -> Advance {
        if self.finished {
            return Advance {
                chunks: Vec::new(),
                done: true,
            };
        }

        let complete = observation.complete || self.force_complete;
        let mut fragments = observation.fragments;
        if !complete {
            fragments.pop();
        }

        let mut chunks = Vec::new();
        let has_new = fragments.len() > self.emitted;
        if !self.preamble_sent && (has_new || complete) {
            chunks.push(observation.preamble);
            self.preamble_sent = true;
        }
        if has_new {
            let total = fragments.len();
            chunks.extend(fragments.drain(self.emitted..));
            self.emitted = total;
        }
        if complete {
            if let Some(failure) = observation.failure {
                chunks.push(error_fragment(&failure));
            }
            chunks.push(TERMINATOR.to_string());
            self.finished = true;
        }

        if !chunks.is_empty() {
            self.last_activity = now;
        }
        Advance {
            chunks,
            done: self.finished,
        }
    }

    /// Record the snapshot's modification time after a poll. When neither
    /// the snapshot nor delivery has moved for the staleness threshold,
    /// the next poll treats the document as complete.
    pub fn observe_modified(&mut self, modified: Option<SystemTime>, now: Instant) {
        if modified.is_some() && modified != self.last_modified {
            self.last_modified = modified;
            self.last_activity = now;
            return;
        }
        if !self.force_complete && now.duration_since(self.last_activity) >= self.staleness_threshold {
            tracing::info!(emitted = self.emitted, "snapshot stale, completing stream");
            self.force_complete = true;
        }
    }
}
