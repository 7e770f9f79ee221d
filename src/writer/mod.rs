//! Incremental notebook writer
//!
//! Owns one generation session's document. Every chunk from the producer
//! is appended, the concatenation is repaired, and both the raw text and
//! the repaired document are published to the snapshot store.
//!
//! # Lifecycle
//!
//! 1. `touch` before the first chunk, so readers never race a missing file
//! 2. `add_chunk` once per chunk, strictly sequentially
//! 3. `finish` exactly once, after the producer ends or fails
//!
//! Storage failures while streaming are logged and skipped: a transient
//! write error must not stall the producer.

mod errors;

pub use errors::{WriterError, WriterResult};

use std::sync::Arc;

use crate::notebook::{repair, Repair};
use crate::render::RenderCache;
use crate::store::{Artifact, SessionKey, SnapshotStore};

/// Accumulates a token stream into published notebook snapshots.
pub struct NotebookWriter {
    key: SessionKey,
    store: Arc<dyn SnapshotStore>,
    renderer: Option<Arc<RenderCache>>,
    raw: String,
    chunks: usize,
    repaired: Repair,
    done: bool,
}

impl NotebookWriter {
    pub fn new(key: SessionKey, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            key,
            store,
            renderer: None,
            raw: String::new(),
            chunks: 0,
            repaired: repair(""),
            done: false,
        }
    }

    /// Seed the stream with text the producer was primed with but will
    /// not repeat (e.g. an opening `{`).
    pub fn with_prefill(mut self, prefill: &str) -> Self {
        if !prefill.is_empty() {
            self.raw.push_str(prefill);
            self.chunks += 1;
            self.repaired = repair(&self.raw);
        }
        self
    }

    /// Render the final document through `cache` on `finish`.
    pub fn with_renderer(mut self, cache: Arc<RenderCache>) -> Self {
        self.renderer = Some(cache);
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Text received so far, prefill included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of chunks received, prefill included.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Latest repair of the raw text.
    pub fn repaired(&self) -> &Repair {
        &self.repaired
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Create empty `Raw` and `Current` artifacts and clear the `Final`
    /// and `Error` artifacts of any earlier session with this key.
    pub fn touch(&self) {
        for artifact in [Artifact::Final, Artifact::Error] {
            if let Err(e) = self.store.remove(&self.key, artifact) {
                tracing::warn!(key = %self.key, error = %e, "failed to clear stale artifact");
            }
        }
        self.persist(Artifact::Raw, self.raw.as_bytes());
        self.persist(Artifact::Current, b"");
    }

    /// Append a chunk, repair the concatenation and publish both.
    pub fn add_chunk(&mut self, part: &str) -> WriterResult<&Repair> {
        if self.done {
            return Err(WriterError::AlreadyFinished(self.key.to_string()));
        }
        self.raw.push_str(part);
        self.chunks += 1;
        self.persist(Artifact::Raw, self.raw.as_bytes());

        self.repaired = repair(&self.raw);
        self.persist(Artifact::Current, self.repaired.json.as_bytes());

        tracing::trace!(
            key = %self.key,
            chunks = self.chunks,
            bytes = self.raw.len(),
            definite = self.repaired.definite,
            "chunk written"
        );
        Ok(&self.repaired)
    }

    /// Freeze the session.
    ///
    /// Writes the producer's failure message (if any), then the final
    /// document, then renders it once so a complete page exists without
    /// waiting for a reader to poll.
    pub fn finish(&mut self, error: Option<&str>) -> WriterResult<()> {
        if self.done {
            return Err(WriterError::AlreadyFinished(self.key.to_string()));
        }
        self.done = true;

        if let Some(message) = error {
            self.store
                .write(&self.key, Artifact::Error, message.as_bytes())?;
        }
        self.store
            .write(&self.key, Artifact::Final, self.repaired.json.as_bytes())?;
        tracing::info!(
            key = %self.key,
            chunks = self.chunks,
            definite = self.repaired.definite,
            failed = error.is_some(),
            "notebook finished"
        );

        if let Some(cache) = &self.renderer {
            match cache.render(self.repaired.json.as_bytes()) {
                Ok(markup) => self.persist(Artifact::Rendered, markup.as_bytes()),
                Err(e) => tracing::warn!(key = %self.key, error = %e, "final render failed"),
            }
        }
        Ok(())
    }

    fn persist(&self, artifact: Artifact, contents: &[u8]) {
        if let Err(e) = self.store.write(&self.key, artifact, contents) {
            tracing::warn!(key = %self.key, ?artifact, error = %e, "snapshot write failed");
        }
    }
}
