//! Content-addressed render cache
//!
//! Streams polling the same session see byte-identical snapshots most of
//! the time; each distinct document is rendered once and shared.
//!
//! - Keyed by SHA-256 of the document bytes
//! - Bounded: the oldest insertion is evicted first
//! - The lock is never held while the renderer runs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::errors::RenderResult;
use super::renderer::Renderer;

/// Hex SHA-256 of a document.
pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<str>>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

/// Shared, lock-guarded render cache in front of a [`Renderer`].
pub struct RenderCache {
    renderer: Arc<dyn Renderer>,
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl RenderCache {
    pub fn new(renderer: Arc<dyn Renderer>, capacity: usize) -> Self {
        Self {
            renderer,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Render `document`, reusing an earlier result for identical bytes.
    ///
    /// Failures are not cached.
    pub fn render(&self, document: &[u8]) -> RenderResult<Arc<str>> {
        let digest = content_digest(document);
        {
            let mut inner = self.inner.lock();
            if let Some(markup) = inner.entries.get(&digest).cloned() {
                inner.hits += 1;
                return Ok(markup);
            }
            inner.misses += 1;
        }

        let markup: Arc<str> = Arc::from(self.renderer.render(document)?);

        let mut inner = self.inner.lock();
        // another stream may have rendered the same bytes meanwhile
        if !inner.entries.contains_key(&digest) {
            inner.entries.insert(digest.clone(), markup.clone());
            inner.order.push_back(digest);
            while inner.order.len() > self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
        }
        Ok(markup)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}
