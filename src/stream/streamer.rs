//! Fragment streamer poll loop
//!
//! Each tick reads the session's snapshot, repairs and renders it, and
//! hands the rendered fragments to [`StreamState`]. Whatever it releases
//! is pushed down the delivery channel. The loop ends on completion, on
//! client disconnect, on a hard failure, or at the iteration cap.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep;

use super::config::StreamConfig;
use super::errors::{StreamError, StreamResult};
use super::state::{Observation, StreamState};
use crate::notebook::repair;
use crate::render::{error_fragment, FragmentExtractor, RenderCache, RenderResult};
use crate::store::{Artifact, SessionKey, SnapshotStore};

/// Starts generation for a locator whose snapshot does not exist yet.
pub trait GenerationTrigger: Send + Sync {
    fn trigger(&self, locator: &str);
}

/// One client's view of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub key: SessionKey,
    pub locator: String,
}

impl StreamRequest {
    pub fn for_locator(locator: impl Into<String>) -> Self {
        let locator = locator.into();
        Self {
            key: SessionKey::for_locator(&locator),
            locator,
        }
    }
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminator delivered after `fragments` fragments.
    Completed { fragments: usize },
    /// The client went away.
    Disconnected,
    /// The snapshot never appeared within the grace window.
    Failed,
    /// Iteration cap reached; closed without terminator.
    Exhausted,
}

enum Probe {
    Missing,
    Ready(Observation),
}

/// Polls sessions and delivers their settled fragments. Cheap to clone;
/// one instance serves every request.
#[derive(Clone)]
pub struct FragmentStreamer {
    store: Arc<dyn SnapshotStore>,
    cache: Arc<RenderCache>,
    extractor: Arc<FragmentExtractor>,
    config: StreamConfig,
    trigger: Option<Arc<dyn GenerationTrigger>>,
}

impl FragmentStreamer {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        cache: Arc<RenderCache>,
        config: StreamConfig,
    ) -> RenderResult<Self> {
        let extractor = FragmentExtractor::new(&config.fragment_tag)?;
        Ok(Self {
            store,
            cache,
            extractor: Arc::new(extractor),
            config,
            trigger: None,
        })
    }

    pub fn with_trigger(mut self, trigger: Arc<dyn GenerationTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Stream `request` into `tx` until the stream ends.
    pub async fn run(&self, request: StreamRequest, tx: mpsc::Sender<String>) -> StreamOutcome {
        let started = Instant::now();
        let mut state = StreamState::new(self.config.staleness_threshold(), started);
        let mut triggered = false;

        for iteration in 0..self.config.iteration_cap {
            if tx.is_closed() {
                tracing::debug!(key = %request.key, iteration, "client disconnected");
                return StreamOutcome::Disconnected;
            }

            let observation = match self.poll(&request.key).await {
                Ok(Probe::Ready(observation)) => observation,
                Ok(Probe::Missing) if started.elapsed() < self.config.grace_window() => {
                    if !triggered {
                        triggered = true;
                        if let Some(trigger) = &self.trigger {
                            tracing::info!(key = %request.key, locator = %request.locator, "snapshot missing, triggering generation");
                            trigger.trigger(&request.locator);
                        }
                    }
                    sleep(self.config.missing_backoff()).await;
                    continue;
                }
                Ok(Probe::Missing) => {
                    tracing::warn!(key = %request.key, "snapshot missing after grace window");
                    let _ = tx
                        .send(error_fragment("The notebook could not be generated."))
                        .await;
                    return StreamOutcome::Failed;
                }
                Err(e) => {
                    tracing::warn!(key = %request.key, iteration, error = %e, "poll failed, retrying");
                    sleep(self.config.poll_interval()).await;
                    continue;
                }
            };

            let complete = observation.complete;
            let available = observation.fragments.len();
            let advance = state.advance(observation, Instant::now());
            if !advance.chunks.is_empty() {
                tracing::debug!(
                    key = %request.key,
                    complete,
                    available,
                    emitted = state.emitted(),
                    "delivering fragments"
                );
            }
            for chunk in advance.chunks {
                if tx.send(chunk).await.is_err() {
                    tracing::debug!(key = %request.key, "client disconnected mid-delivery");
                    return StreamOutcome::Disconnected;
                }
            }
            if advance.done {
                tracing::info!(key = %request.key, fragments = state.emitted(), iterations = iteration + 1, "stream complete");
                return StreamOutcome::Completed {
                    fragments: state.emitted(),
                };
            }

            let modified = match self.store.modified(&request.key, Artifact::Current) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(key = %request.key, error = %e, "failed to stat snapshot");
                    None
                }
            };
            state.observe_modified(modified, Instant::now());

            sleep(self.config.poll_interval()).await;
        }

        tracing::warn!(key = %request.key, cap = self.config.iteration_cap, "iteration cap reached, closing stream");
        StreamOutcome::Exhausted
    }

    async fn poll(&self, key: &SessionKey) -> StreamResult<Probe> {
        let store = self.store.clone();
        let cache = self.cache.clone();
        let extractor = self.extractor.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || probe(store.as_ref(), &cache, &extractor, &key))
            .await
            .map_err(|e| StreamError::Task(e.to_string()))?
    }
}

/// Read, repair and render the session's snapshot once.
///
/// A non-empty `Final` artifact wins and marks the document complete;
/// otherwise `Raw` is repaired and is complete only if the repair is
/// definite.
fn probe(
    store: &dyn SnapshotStore,
    cache: &RenderCache,
    extractor: &FragmentExtractor,
    key: &SessionKey,
) -> StreamResult<Probe> {
    if let Some(document) = store.read(key, Artifact::Final)?.filter(|b| !b.is_empty()) {
        let repaired = repair(&String::from_utf8_lossy(&document));
        let failure = store
            .read(key, Artifact::Error)?
            .map(|b| String::from_utf8_lossy(&b).trim().to_string())
            .filter(|s| !s.is_empty());
        return observe(cache, extractor, &repaired.json, true, failure);
    }

    let raw = match store.read(key, Artifact::Raw)? {
        Some(raw) => raw,
        None => return Ok(Probe::Missing),
    };
    let repaired = repair(&String::from_utf8_lossy(&raw));
    observe(cache, extractor, &repaired.json, repaired.definite, None)
}

fn observe(
    cache: &RenderCache,
    extractor: &FragmentExtractor,
    json: &str,
    complete: bool,
    failure: Option<String>,
) -> StreamResult<Probe> {
    let markup = cache.render(json.as_bytes())?;
    Ok(Probe::Ready(Observation {
        preamble: extractor.preamble(&markup).to_string(),
        fragments: extractor.fragments(&markup),
        complete,
        failure,
    }))
}
