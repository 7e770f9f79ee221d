//! Notebook HTTP Routes
//!
//! Every path not claimed by another router names a notebook. The
//! response streams that notebook's page as it is generated.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::stream;
use tokio::sync::mpsc;

use crate::generation::SessionRegistry;
use crate::render::RenderCache;
use crate::stream::{FragmentStreamer, StreamRequest};

// ==================
// Shared State
// ==================

/// State shared by the notebook, health and session handlers
pub struct NotebookState {
    pub registry: SessionRegistry,
    pub streamer: FragmentStreamer,
    pub cache: Arc<RenderCache>,
}

impl NotebookState {
    pub fn new(registry: SessionRegistry, streamer: FragmentStreamer, cache: Arc<RenderCache>) -> Self {
        Self {
            registry,
            streamer,
            cache,
        }
    }
}

/// Catch-all router streaming notebooks
pub fn notebook_routes(state: Arc<NotebookState>) -> Router {
    Router::new().fallback(stream_handler).with_state(state)
}

/// Resource locator of a request: path plus query.
pub fn locator_for(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

async fn stream_handler(
    State(state): State<Arc<NotebookState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    if uri.path() == "/favicon.ico" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let locator = locator_for(&uri);
    let registry = state.registry.clone();
    let ensure_locator = locator.clone();
    // store I/O; keep it off the async workers
    let decision = match tokio::task::spawn_blocking(move || registry.ensure(&ensure_locator)).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(locator = %locator, error = %e, "session lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let request = StreamRequest::for_locator(locator);
    tracing::info!(key = %request.key, locator = %request.locator, ?decision, "streaming notebook");

    let (tx, rx) = mpsc::channel::<String>(state.streamer.config().channel_capacity.max(1));
    let streamer = state.streamer.clone();
    tokio::spawn(async move {
        let key = request.key.clone();
        let outcome = streamer.run(request, tx).await;
        tracing::debug!(%key, ?outcome, "stream ended");
    });

    let frames = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(Bytes::from(chunk)), rx))
    });

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory state for router tests.

    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::NotebookState;
    use crate::generation::{GenerationConfig, GenerationResult, SessionRegistry, TokenSource};
    use crate::notebook::Notebook;
    use crate::render::{RenderCache, RenderError, RenderResult, Renderer};
    use crate::store::MemorySnapshotStore;
    use crate::stream::{FragmentStreamer, StreamConfig};

    pub struct CellRenderer;

    impl Renderer for CellRenderer {
        fn render(&self, document: &[u8]) -> RenderResult<String> {
            let nb: Notebook = serde_json::from_slice(document).map_err(|e| RenderError::Failed {
                status: None,
                stderr: e.to_string(),
            })?;
            let cells: String = nb
                .cells
                .iter()
                .map(|c| format!("<div class=\"cell\">{}</div>", c.id))
                .collect();
            Ok(format!("<html><body><main>{}</main></body></html>", cells))
        }
    }

    pub struct FixedSource(pub &'static str);

    #[async_trait]
    impl TokenSource for FixedSource {
        async fn generate(&self, _locator: &str, tx: mpsc::Sender<String>) -> GenerationResult<()> {
            for part in self.0.split_inclusive(',') {
                let _ = tx.send(part.to_string()).await;
            }
            Ok(())
        }
    }

    pub fn state(document: &'static str) -> Arc<NotebookState> {
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = Arc::new(RenderCache::new(Arc::new(CellRenderer), 16));
        let registry = SessionRegistry::new(
            store.clone(),
            Arc::new(FixedSource(document)),
            Some(cache.clone()),
            GenerationConfig::default(),
        );
        let config = StreamConfig {
            poll_interval_ms: 5,
            missing_backoff_ms: 5,
            ..Default::default()
        };
        let streamer = FragmentStreamer::new(store, cache.clone(), config)
            .unwrap()
            .with_trigger(Arc::new(registry.clone()));
        Arc::new(NotebookState::new(registry, streamer, cache))
    }
}
