//! Generation session registry
//!
//! At most one session runs per key. A request for a key that is already
//! generating attaches to it; a request for a key whose final document is
//! still fresh replays it; anything else starts a new session.
//!
//! Sessions run on their own task and outlive the request that started
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::config::GenerationConfig;
use super::errors::GenerationError;
use super::source::TokenSource;
use crate::render::RenderCache;
use crate::store::{is_fresh, SessionKey, SnapshotStore};
use crate::stream::GenerationTrigger;
use crate::writer::NotebookWriter;

/// What [`SessionRegistry::ensure`] did for a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionDecision {
    /// A new session was spawned.
    Started,
    /// A session for the key was already running.
    Attached,
    /// The key's final document is fresh; nothing was spawned.
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Completed,
    Failed,
}

/// Snapshot of one session's bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub key: SessionKey,
    pub locator: String,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

enum Claim {
    Started(Uuid, NotebookWriter),
    Attached,
    Replay,
}

struct RegistryInner {
    store: Arc<dyn SnapshotStore>,
    source: Arc<dyn TokenSource>,
    cache: Option<Arc<RenderCache>>,
    config: GenerationConfig,
    sessions: Mutex<HashMap<SessionKey, SessionInfo>>,
}

/// Shared handle to the set of generation sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// `cache`, when given, renders each finished document once.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        source: Arc<dyn TokenSource>,
        cache: Option<Arc<RenderCache>>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                store,
                source,
                cache,
                config,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.inner.config
    }

    /// Make sure the document for `locator` exists or is being produced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure(&self, locator: &str) -> SessionDecision {
        let key = SessionKey::for_locator(locator);
        self.prune();

        let (id, writer) = match self.begin(&key, locator, true) {
            Claim::Started(id, writer) => (id, writer),
            Claim::Attached => return SessionDecision::Attached,
            Claim::Replay => {
                tracing::debug!(%key, locator, "replaying fresh notebook");
                return SessionDecision::Replay;
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = self.inner.clone();
                let locator = locator.to_string();
                handle.spawn(async move {
                    run_session(inner, id, locator, writer).await;
                });
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "no runtime to run generation on");
                self.record(&key, id, Some(format!("no runtime: {}", e)));
            }
        }
        SessionDecision::Started
    }

    /// Generate `locator` on the current task, regardless of freshness,
    /// and return the session's final bookkeeping. `None` when a session
    /// for the key is already running.
    pub async fn run_to_completion(&self, locator: &str) -> Option<SessionInfo> {
        let key = SessionKey::for_locator(locator);
        let (id, writer) = match self.begin(&key, locator, false) {
            Claim::Started(id, writer) => (id, writer),
            Claim::Attached | Claim::Replay => return None,
        };
        run_session(self.inner.clone(), id, locator.to_string(), writer).await;
        self.session(&key)
    }

    /// Bookkeeping for one key.
    pub fn session(&self, key: &SessionKey) -> Option<SessionInfo> {
        self.inner.sessions.lock().get(key).cloned()
    }

    /// Every known session, newest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.inner.sessions.lock().values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    /// Claim `key` for a new session and prepare its writer. The running
    /// check, the freshness check and the claim share one lock.
    fn begin(&self, key: &SessionKey, locator: &str, replay_fresh: bool) -> Claim {
        let id = Uuid::new_v4();
        {
            let mut sessions = self.inner.sessions.lock();
            if matches!(sessions.get(key), Some(info) if info.state == SessionState::Running) {
                return Claim::Attached;
            }
            if replay_fresh
                && is_fresh(
                    self.inner.store.as_ref(),
                    key,
                    self.inner.config.freshness_window(),
                )
            {
                return Claim::Replay;
            }
            sessions.insert(
                key.clone(),
                SessionInfo {
                    id,
                    key: key.clone(),
                    locator: locator.to_string(),
                    state: SessionState::Running,
                    started_at: Utc::now(),
                    finished_at: None,
                    error: None,
                },
            );
        }

        let mut writer = NotebookWriter::new(key.clone(), self.inner.store.clone())
            .with_prefill(&self.inner.config.prefill);
        if let Some(cache) = &self.inner.cache {
            writer = writer.with_renderer(cache.clone());
        }
        writer.touch();
        tracing::info!(%key, locator, session = %id, "generation started");
        Claim::Started(id, writer)
    }

    fn record(&self, key: &SessionKey, id: Uuid, error: Option<String>) {
        record(&self.inner, key, id, error);
    }

    /// Forget finished sessions whose documents are no longer fresh.
    fn prune(&self) {
        let window = self.inner.config.freshness_window();
        let now = Utc::now();
        self.inner.sessions.lock().retain(|_, info| match info.finished_at {
            Some(finished) => (now - finished)
                .to_std()
                .map(|age| age <= window)
                .unwrap_or(true),
            None => true,
        });
    }
}

impl GenerationTrigger for SessionRegistry {
    fn trigger(&self, locator: &str) {
        let decision = self.ensure(locator);
        tracing::debug!(locator, ?decision, "generation triggered");
    }
}

/// Drive one session: producer on this task, writer on a blocking task,
/// then freeze the document.
async fn run_session(inner: Arc<RegistryInner>, id: Uuid, locator: String, writer: NotebookWriter) {
    let key = writer.key().clone();
    let (tx, mut rx) = mpsc::channel::<String>(inner.config.chunk_buffer.max(1));

    let consumer = tokio::task::spawn_blocking(move || {
        let mut writer = writer;
        while let Some(chunk) = rx.blocking_recv() {
            if let Err(e) = writer.add_chunk(&chunk) {
                tracing::warn!(key = %writer.key(), error = %e, "dropping chunk");
                break;
            }
        }
        writer
    });

    let timeout = inner.config.timeout();
    let produced = match tokio::time::timeout(timeout, inner.source.generate(&locator, tx)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(timeout)),
    };
    let error = match produced {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(%key, code = e.code(), error = %e, "generation failed");
            Some(e.to_string())
        }
    };

    let mut writer = match consumer.await {
        Ok(writer) => writer,
        Err(e) => {
            tracing::error!(%key, error = %e, "writer task failed");
            record(&inner, &key, id, Some(format!("writer task failed: {}", e)));
            return;
        }
    };

    let failure = error.clone();
    let finished = tokio::task::spawn_blocking(move || writer.finish(failure.as_deref())).await;
    let error = match finished {
        Ok(Ok(())) => error,
        Ok(Err(e)) => {
            tracing::error!(%key, error = %e, "failed to finish notebook");
            Some(error.unwrap_or_else(|| e.to_string()))
        }
        Err(e) => {
            tracing::error!(%key, error = %e, "finish task failed");
            Some(error.unwrap_or_else(|| e.to_string()))
        }
    };
    record(&inner, &key, id, error);
}

fn record(inner: &RegistryInner, key: &SessionKey, id: Uuid, error: Option<String>) {
    let mut sessions = inner.sessions.lock();
    // a newer session may have replaced this one
    if let Some(info) = sessions.get_mut(key).filter(|info| info.id == id) {
        info.state = if error.is_some() {
            SessionState::Failed
        } else {
            SessionState::Completed
        };
        info.finished_at = Some(Utc::now());
        info.error = error;
        tracing::info!(%key, session = %id, state = ?info.state, "generation ended");
    }
}
