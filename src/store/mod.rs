//! Snapshot store
//!
//! The only channel between a generation session and the streams reading
//! it. A session's writer publishes named artifacts under a key derived
//! from the request locator; any number of readers poll them.
//!
//! # Reader contract
//!
//! - `Raw` and `Current` may be briefly absent or empty
//! - `Final` is written once per session and never changes afterwards
//! - Writes replace an artifact whole

mod errors;
mod fs;
mod key;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use fs::FsSnapshotStore;
pub use key::{Artifact, SessionKey};
pub use memory::MemorySnapshotStore;

use std::time::{Duration, SystemTime};

/// Keyed artifact storage shared by one writer and many readers.
pub trait SnapshotStore: Send + Sync {
    /// Replace an artifact's contents.
    fn write(&self, key: &SessionKey, artifact: Artifact, contents: &[u8]) -> StoreResult<()>;

    /// Read an artifact; `None` when it does not exist.
    fn read(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<Vec<u8>>>;

    /// Delete an artifact. Deleting a missing artifact succeeds.
    fn remove(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<()>;

    /// Last modification time; `None` when it does not exist.
    fn modified(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<SystemTime>>;
}

/// Whether a finished session can be replayed instead of regenerated:
/// its final artifact exists, is non-empty, and was written within
/// `window`. A session that recorded a failure is never fresh.
pub fn is_fresh(store: &dyn SnapshotStore, key: &SessionKey, window: Duration) -> bool {
    let non_empty = matches!(store.read(key, Artifact::Final), Ok(Some(bytes)) if !bytes.is_empty());
    if !non_empty {
        return false;
    }
    if matches!(store.read(key, Artifact::Error), Ok(Some(bytes)) if !bytes.is_empty()) {
        return false;
    }
    match store.modified(key, Artifact::Final) {
        Ok(Some(modified)) => SystemTime::now()
            .duration_since(modified)
            .map(|age| age <= window)
            // modified in the future: clock skew, treat as just written
            .unwrap_or(true),
        _ => false,
    }
}
