//! End-to-End Streaming Pipeline Tests
//!
//! A scripted producer feeds a real session registry; a fragment streamer
//! reads the same snapshot store and its output is checked against the
//! finished document.
//!
//! Test Categories:
//! 1. Ordered, never-altered delivery
//! 2. Completion by finish, failure and staleness
//! 3. Replay and client disconnect
//! 4. Filesystem store and HTTP surface

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use nbstream::generation::{
    GenerationConfig, GenerationError, GenerationResult, SessionDecision, SessionRegistry,
    SessionState, TokenSource,
};
use nbstream::http_server::{HttpServer, HttpServerConfig, NotebookState};
use nbstream::notebook::Notebook;
use nbstream::render::{RenderCache, RenderError, RenderResult, Renderer};
use nbstream::store::{Artifact, FsSnapshotStore, MemorySnapshotStore, SessionKey, SnapshotStore};
use nbstream::stream::{FragmentStreamer, StreamConfig, StreamOutcome, StreamRequest, TERMINATOR};

// =============================================================================
// HARNESS
// =============================================================================

const PREAMBLE: &str = "<html><head><title>nb</title></head><body><main>";

/// One `<div class="cell">` per cell: id and joined source.
struct CellRenderer;

impl Renderer for CellRenderer {
    fn render(&self, document: &[u8]) -> RenderResult<String> {
        let nb: Notebook = serde_json::from_slice(document).map_err(|e| RenderError::Failed {
            status: None,
            stderr: e.to_string(),
        })?;
        let cells: String = nb
            .cells
            .iter()
            .map(|c| {
                let source = c.source.as_ref().map(|s| s.text()).unwrap_or_default();
                format!("<div class=\"cell\">{}: {}</div>", c.id, source)
            })
            .collect();
        Ok(format!("{}{}</main></body></html>", PREAMBLE, cells))
    }
}

enum Ending {
    Success,
    Fail(&'static str),
    Hang,
}

/// Emits a fixed text in small pieces with a pause between them.
struct Scripted {
    text: String,
    piece: usize,
    pause: Duration,
    ending: Ending,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(text: String, ending: Ending) -> Self {
        Self {
            text,
            piece: 9,
            pause: Duration::from_millis(2),
            ending,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenSource for Scripted {
    async fn generate(&self, _locator: &str, tx: mpsc::Sender<String>) -> GenerationResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self.text.as_bytes();
        for piece in bytes.chunks(self.piece) {
            let _ = tx.send(String::from_utf8_lossy(piece).into_owned()).await;
            tokio::time::sleep(self.pause).await;
        }
        match self.ending {
            Ending::Success => Ok(()),
            Ending::Fail(message) => Err(GenerationError::Producer(message.to_string())),
            Ending::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

fn document(cells: usize) -> String {
    let cells: Vec<_> = (0..cells)
        .map(|i| json!({"id": format!("c{}", i), "cell_type": "code", "source": format!("x = {}", i)}))
        .collect();
    json!({"cells": cells}).to_string()
}

fn expected_fragment(i: usize) -> String {
    format!("<div class=\"cell\">c{}: x = {}</div>", i, i)
}

fn fast_stream() -> StreamConfig {
    StreamConfig {
        poll_interval_ms: 5,
        missing_backoff_ms: 5,
        grace_window_ms: 2_000,
        iteration_cap: 5_000,
        ..Default::default()
    }
}

struct Harness {
    store: Arc<dyn SnapshotStore>,
    registry: SessionRegistry,
    streamer: FragmentStreamer,
    cache: Arc<RenderCache>,
}

fn harness(store: Arc<dyn SnapshotStore>, source: Arc<dyn TokenSource>, stream: StreamConfig) -> Harness {
    let cache = Arc::new(RenderCache::new(Arc::new(CellRenderer), 64));
    let registry = SessionRegistry::new(
        store.clone(),
        source,
        Some(cache.clone()),
        GenerationConfig::default(),
    );
    let streamer = FragmentStreamer::new(store.clone(), cache.clone(), stream)
        .unwrap()
        .with_trigger(Arc::new(registry.clone()));
    Harness {
        store,
        registry,
        streamer,
        cache,
    }
}

/// Run one stream to its end and return the outcome and delivered chunks.
async fn stream_all(streamer: &FragmentStreamer, locator: &str) -> (StreamOutcome, Vec<String>) {
    let (tx, mut rx) = mpsc::channel(4);
    let streamer = streamer.clone();
    let request = StreamRequest::for_locator(locator);
    let handle = tokio::spawn(async move { streamer.run(request, tx).await });

    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }
    (handle.await.unwrap(), chunks)
}

async fn wait_until_finished(registry: &SessionRegistry, locator: &str) -> SessionState {
    let key = SessionKey::for_locator(locator);
    for _ in 0..1_000 {
        if let Some(info) = registry.session(&key) {
            if info.state != SessionState::Running {
                return info.state;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session for {} never finished", locator);
}

// =============================================================================
// ORDERED DELIVERY
// =============================================================================

/// Test: fragments arrive once each, in order, exactly as in the final page.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fragments_arrive_in_order_and_never_change() {
    let source = Arc::new(Scripted::new(document(4), Ending::Success));
    let h = harness(Arc::new(MemorySnapshotStore::new()), source, fast_stream());

    assert_eq!(h.registry.ensure("/ordered"), SessionDecision::Started);
    let (outcome, chunks) = stream_all(&h.streamer, "/ordered").await;

    assert_eq!(outcome, StreamOutcome::Completed { fragments: 4 });
    let mut expected = vec![PREAMBLE.to_string()];
    expected.extend((0..4).map(expected_fragment));
    expected.push(TERMINATOR.to_string());
    assert_eq!(chunks, expected);
}

/// Test: a stream started before the session triggers generation itself.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_triggers_missing_session() {
    let source = Arc::new(Scripted::new(document(2), Ending::Success));
    let h = harness(Arc::new(MemorySnapshotStore::new()), source.clone(), fast_stream());

    let (outcome, chunks) = stream_all(&h.streamer, "/lazy").await;

    assert_eq!(outcome, StreamOutcome::Completed { fragments: 2 });
    assert_eq!(chunks.last().map(String::as_str), Some(TERMINATOR));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// COMPLETION
// =============================================================================

/// Test: a producer failure shows up as one error fragment before the
/// terminator, after every cell.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_producer_failure_appends_error_fragment() {
    let full = document(3);
    // drop the closing brackets so no snapshot is ever a definite document
    let truncated = full[..full.len() - 3].to_string();
    let source = Arc::new(Scripted::new(truncated, Ending::Fail("upstream quota exhausted")));
    let h = harness(Arc::new(MemorySnapshotStore::new()), source, fast_stream());

    h.registry.ensure("/failing");
    let (outcome, chunks) = stream_all(&h.streamer, "/failing").await;

    assert_eq!(outcome, StreamOutcome::Completed { fragments: 3 });
    assert_eq!(chunks[0], PREAMBLE);
    assert_eq!(chunks[1], expected_fragment(0));
    assert_eq!(chunks[2], expected_fragment(1));
    let error = &chunks[chunks.len() - 2];
    assert!(error.contains("nbstream-error"));
    assert!(error.contains("upstream quota exhausted"));
    assert_eq!(chunks[chunks.len() - 1], TERMINATOR);
    assert_eq!(
        chunks.iter().filter(|c| c.as_str() == TERMINATOR).count(),
        1
    );

    assert_eq!(wait_until_finished(&h.registry, "/failing").await, SessionState::Failed);
}

/// Test: a producer that stops sending without finishing is completed by
/// the staleness threshold.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stalled_producer_completes_by_staleness() {
    let full = document(3);
    let truncated = full[..full.len() - 3].to_string();
    let source = Arc::new(Scripted::new(truncated, Ending::Hang));
    let stream = StreamConfig {
        staleness_threshold_ms: 150,
        ..fast_stream()
    };
    let h = harness(Arc::new(MemorySnapshotStore::new()), source, stream);

    h.registry.ensure("/stalled");
    let (outcome, chunks) = tokio::time::timeout(Duration::from_secs(10), stream_all(&h.streamer, "/stalled"))
        .await
        .expect("stream hung on a stalled producer");

    assert_eq!(outcome, StreamOutcome::Completed { fragments: 3 });
    assert_eq!(chunks[1], expected_fragment(0));
    assert_eq!(chunks[3], expected_fragment(2));
    assert_eq!(chunks.last().map(String::as_str), Some(TERMINATOR));
    assert!(h
        .store
        .read(&SessionKey::for_locator("/stalled"), Artifact::Final)
        .unwrap()
        .is_none());
}

// =============================================================================
// REPLAY AND DISCONNECT
// =============================================================================

/// Test: a finished notebook is replayed without running the producer again.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_finished_notebook_is_replayed() {
    let source = Arc::new(Scripted::new(document(2), Ending::Success));
    let h = harness(Arc::new(MemorySnapshotStore::new()), source.clone(), fast_stream());

    h.registry.ensure("/replayed");
    let (_, first) = stream_all(&h.streamer, "/replayed").await;
    assert_eq!(wait_until_finished(&h.registry, "/replayed").await, SessionState::Completed);

    assert_eq!(h.registry.ensure("/replayed"), SessionDecision::Replay);
    let (outcome, second) = stream_all(&h.streamer, "/replayed").await;

    assert_eq!(outcome, StreamOutcome::Completed { fragments: 2 });
    assert_eq!(first, second);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(h.cache.stats().hits > 0);
}

/// Test: a client leaving mid-stream stops its stream but not the session.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnect_does_not_cancel_generation() {
    let mut scripted = Scripted::new(document(6), Ending::Success);
    scripted.pause = Duration::from_millis(10);
    let h = harness(Arc::new(MemorySnapshotStore::new()), Arc::new(scripted), fast_stream());

    h.registry.ensure("/abandoned");
    let (tx, mut rx) = mpsc::channel(1);
    let streamer = h.streamer.clone();
    let handle = tokio::spawn(async move {
        streamer
            .run(StreamRequest::for_locator("/abandoned"), tx)
            .await
    });

    assert_eq!(rx.recv().await.as_deref(), Some(PREAMBLE));
    drop(rx);

    assert_eq!(handle.await.unwrap(), StreamOutcome::Disconnected);
    assert_eq!(
        wait_until_finished(&h.registry, "/abandoned").await,
        SessionState::Completed
    );
    assert!(h
        .store
        .read(&SessionKey::for_locator("/abandoned"), Artifact::Final)
        .unwrap()
        .is_some());
}

// =============================================================================
// FILESYSTEM STORE AND HTTP
// =============================================================================

/// Test: the pipeline behaves the same over files, and leaves the
/// rendered page next to the final document.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_filesystem_store_pipeline() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FsSnapshotStore::new(dir.path()));
    let source = Arc::new(Scripted::new(document(3), Ending::Success));
    let h = harness(store.clone(), source, fast_stream());

    h.registry.ensure("/files?v=1");
    let (outcome, chunks) = stream_all(&h.streamer, "/files?v=1").await;
    assert_eq!(outcome, StreamOutcome::Completed { fragments: 3 });
    assert_eq!(chunks.len(), 5);

    wait_until_finished(&h.registry, "/files?v=1").await;
    let key = SessionKey::for_locator("/files?v=1");
    assert!(store.path(&key, Artifact::Final).exists());
    let rendered = std::fs::read_to_string(store.path(&key, Artifact::Rendered)).unwrap();
    assert!(rendered.contains(&expected_fragment(2)));
}

/// Test: the HTTP surface streams the full page for an arbitrary path.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_http_streams_notebook() {
    let source = Arc::new(Scripted::new(document(2), Ending::Success));
    let h = harness(Arc::new(MemorySnapshotStore::new()), source, fast_stream());
    let state = Arc::new(NotebookState::new(h.registry, h.streamer, h.cache));
    let router = HttpServer::with_config(HttpServerConfig::default(), state).router();

    let response = router
        .oneshot(
            Request::get("/lessons/gradient-descent?level=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(
        page,
        format!(
            "{}{}{}{}",
            PREAMBLE,
            expected_fragment(0),
            expected_fragment(1),
            TERMINATOR
        )
    );
}
