//! Filesystem-backed snapshot store
//!
//! Artifacts live side by side in one directory. Every write goes to a
//! temporary file in the same directory and is renamed into place, so a
//! reader sees either the previous artifact or the new one in full.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::errors::{StoreError, StoreResult};
use super::key::{Artifact, SessionKey};
use super::SnapshotStore;

/// Snapshot store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an artifact.
    pub fn path(&self, key: &SessionKey, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name(key))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn write(&self, key: &SessionKey, artifact: Artifact, contents: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let path = self.path(key, artifact);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| StoreError::io(&self.root, e))?;
        tmp.write_all(contents)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        Ok(())
    }

    fn read(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path(key, artifact);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn remove(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<()> {
        let path = self.path(key, artifact);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn modified(&self, key: &SessionKey, artifact: Artifact) -> StoreResult<Option<SystemTime>> {
        let path = self.path(key, artifact);
        match fs::metadata(&path) {
            Ok(meta) => meta.modified().map(Some).map_err(|e| StoreError::io(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> SessionKey {
        SessionKey::for_locator("/test")
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("generated"));

        store.write(&key(), Artifact::Raw, b"{\"cells\":").unwrap();
        let bytes = store.read(&key(), Artifact::Raw).unwrap().unwrap();
        assert_eq!(bytes, b"{\"cells\":");
        assert!(store.path(&key(), Artifact::Raw).exists());
    }

    #[test]
    fn test_missing_artifact_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path());

        assert!(store.read(&key(), Artifact::Final).unwrap().is_none());
        assert!(store.modified(&key(), Artifact::Final).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path());

        store.write(&key(), Artifact::Current, b"first, longer contents").unwrap();
        store.write(&key(), Artifact::Current, b"second").unwrap();
        assert_eq!(store.read(&key(), Artifact::Current).unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path());

        store.write(&key(), Artifact::Error, b"boom").unwrap();
        store.remove(&key(), Artifact::Error).unwrap();
        store.remove(&key(), Artifact::Error).unwrap();
        assert!(store.read(&key(), Artifact::Error).unwrap().is_none());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path());

        store.write(&key(), Artifact::Raw, b"x").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
