//! On-disk sandbox index and its lock.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::SandboxDescriptor;
use crate::error::{SandboxError, SandboxResult};

/// Contents of `index.json`. Entries are kept in creation order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SandboxIndex {
    #[serde(default)]
    pub(crate) sandboxes: Vec<SandboxDescriptor>,
}

impl SandboxIndex {
    /// Read the index. A missing file is an empty index.
    pub(crate) fn load(path: &Path) -> SandboxResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|source| SandboxError::IndexCorrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the index file atomically.
    pub(crate) fn save(&self, path: &Path) -> SandboxResult<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SandboxError::Io(e.error))?;

        debug!(path = %path.display(), entries = self.sandboxes.len(), "Saved sandbox index");
        Ok(())
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.sandboxes.iter().position(|s| s.sandbox_id == id)
    }
}

/// Exclusive advisory lock on the index, released on drop.
pub(crate) struct IndexLock {
    file: std::fs::File,
}

impl IndexLock {
    /// Block until the lock at `path` is held.
    pub(crate) fn acquire(path: &Path) -> SandboxResult<Self> {
        use fs2::FileExt;

        let lock_err = |source| SandboxError::Lock {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        Ok(Self { file })
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        // fs2::FileExt::unlock requires the trait in scope.
        let _ = <std::fs::File as fs2::FileExt>::unlock(&self.file);
    }
}

/// Lock file next to `index_path`.
pub(crate) fn lock_path_for(index_path: &Path) -> PathBuf {
    index_path.with_extension("lock")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::descriptor::SandboxStatus;

    fn descriptor(id: &str) -> SandboxDescriptor {
        SandboxDescriptor {
            sandbox_id: id.into(),
            path: PathBuf::from("/tmp").join(id),
            kind: "sandbox".into(),
            created_at: Utc::now(),
            status: SandboxStatus::Ready,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = SandboxIndex::load(&dir.path().join("index.json")).unwrap();
        assert!(index.sandboxes.is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/sandbox/index.json");
        let index = SandboxIndex {
            sandboxes: vec![descriptor("b"), descriptor("a")],
        };
        index.save(&path).unwrap();

        let loaded = SandboxIndex::load(&path).unwrap();
        let ids: Vec<_> = loaded.sandboxes.iter().map(|s| s.sandbox_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(loaded.position("a"), Some(1));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["sandboxes"].is_array());
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SandboxIndex::load(&path),
            Err(SandboxError::IndexCorrupt { .. })
        ));
    }

    #[test]
    fn test_lock_can_be_reacquired_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path_for(&dir.path().join("index.json"));
        assert_eq!(path.file_name().unwrap(), "index.lock");
        drop(IndexLock::acquire(&path).unwrap());
        let _again = IndexLock::acquire(&path).unwrap();
    }
}
