//! In-memory snapshot store
//!
//! Same contract as the filesystem store, without the filesystem.
//! Useful where producer and consumer share a process.

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::errors::StoreResult;
use super::key::{Artifact, SessionKey};
use super::SnapshotStore;

#[derive(Debug, Clone)]
struct Entry {
    contents: Vec<u8>,
    modified: SystemTime,
}

/// Lock-guarded map of artifacts.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<(SessionKey, Artifact), Entry>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Overwrite an artifact's modification time.
    pub fn set_modified(&self, key: &SessionKey, artifact: Artifact, modified: SystemTime) {
        if let Some(entry) = self.entries.write().get_mut(&(key.clone(), artifact)) {
            entry.modified = modified;
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn write(&self, key: &SessionKey, artifact: Artifact, contents: &[u8]) -> StoreResult<()> {
        self.entries.write().insert(
            (key.clone(), artifact),
            Entry {
                contents: contents.to_vec(),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn read(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .get(&(key.clone(), artifact))
            .map(|e| e.contents.clone()))
    }

    fn remove(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<()> {
        self.entries.write().remove(&(key.clone(), artifact));
        Ok(())
    }

    fn modified(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<SystemTime>> {
        Ok(self
            .entries
            .read()
            .get(&(key.clone(), artifact))
            .map(|e| e.modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_remove() {
        let store = MemorySnapshotStore::new();
        let key = SessionKey::for_locator("/a");

        assert!(store.is_empty());
        store.write(&key, Artifact::Raw, b"{").unwrap();
        assert_eq!(store.read(&key, Artifact::Raw).unwrap().unwrap(), b"{");
        assert!(store.modified(&key, Artifact::Raw).unwrap().is_some());

        store.remove(&key, Artifact::Raw).unwrap();
        assert!(store.read(&key, Artifact::Raw).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_isolated() {
        let store = MemorySnapshotStore::new();
        let a = SessionKey::for_locator("/a");
        let b = SessionKey::for_locator("/b");

        store.write(&a, Artifact::Final, b"a").unwrap();
        assert!(store.read(&b, Artifact::Final).unwrap().is_none());
        assert_eq!(store.len(), 1);
    }
}
