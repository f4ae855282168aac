//! Sandbox lifecycle: create, list, remove, purge.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use agentcontrol_core::ProjectId;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::descriptor::{MetadataValue, SandboxDescriptor, SandboxStatus};
use crate::error::{SandboxError, SandboxResult};
use crate::index::{IndexLock, SandboxIndex, lock_path_for};

/// Kind used when the caller does not name one.
pub const DEFAULT_KIND: &str = "sandbox";

/// Hex characters appended to the timestamp part of an id.
const ID_SUFFIX_LEN: usize = 6;

/// Attempts at finding an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Manages the sandboxes of one project.
#[derive(Debug, Clone)]
pub struct SandboxManager {
    root: PathBuf,
    index_path: PathBuf,
    lock_path: PathBuf,
}

impl SandboxManager {
    /// Manager for `project`, rooted at `<capsule>/sandbox`.
    #[must_use]
    pub fn new(project: &ProjectId) -> Self {
        Self::with_paths(project.sandbox_root(), &project.state_dir())
    }

    /// Manager with explicit workspace root and capsule state directory.
    #[must_use]
    pub fn with_paths(root: impl Into<PathBuf>, state_dir: &Path) -> Self {
        let index_path = state_dir.join("sandbox").join("index.json");
        Self {
            root: root.into(),
            lock_path: lock_path_for(&index_path),
            index_path,
        }
    }

    /// Directory holding every sandbox workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the JSON index.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Allocate a fresh sandbox and populate it with `materialize`.
    ///
    /// The directory exists and is listed once this returns. If
    /// `materialize` fails the directory is removed and nothing is indexed.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InvalidKind`] for unusable kind labels,
    /// [`SandboxError::Materialise`] if `materialize` fails, and lock, index
    /// or I/O errors otherwise.
    pub fn create<F>(
        &self,
        kind: &str,
        materialize: F,
        metadata: BTreeMap<String, MetadataValue>,
    ) -> SandboxResult<SandboxDescriptor>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        validate_kind(kind)?;

        let _lock = IndexLock::acquire(&self.lock_path)?;
        let mut index = SandboxIndex::load(&self.index_path)?;
        std::fs::create_dir_all(&self.root)?;

        let (sandbox_id, path) = self.allocate(&index)?;
        debug!(sandbox_id = %sandbox_id, kind, "Materialising sandbox");

        if let Err(source) = materialize(&path) {
            discard_workspace(&path);
            return Err(SandboxError::Materialise {
                id: sandbox_id,
                source,
            });
        }

        let descriptor = SandboxDescriptor {
            sandbox_id,
            path,
            kind: kind.to_owned(),
            created_at: Utc::now(),
            status: SandboxStatus::Ready,
            metadata,
        };
        index.sandboxes.push(descriptor.clone());
        if let Err(e) = index.save(&self.index_path) {
            discard_workspace(&descriptor.path);
            return Err(e);
        }

        info!(
            sandbox_id = %descriptor.sandbox_id,
            path = %descriptor.path.display(),
            kind,
            "Created sandbox"
        );
        Ok(descriptor)
    }

    /// Sandboxes in creation order.
    ///
    /// Entries whose directory no longer exists are dropped from the index.
    ///
    /// # Errors
    ///
    /// Returns lock, index or I/O errors.
    pub fn list(&self) -> SandboxResult<Vec<SandboxDescriptor>> {
        let _lock = IndexLock::acquire(&self.lock_path)?;
        let mut index = SandboxIndex::load(&self.index_path)?;

        let before = index.sandboxes.len();
        index.sandboxes.retain(|s| {
            let present = s.path.is_dir();
            if !present {
                debug!(sandbox_id = %s.sandbox_id, "Dropping sandbox whose directory vanished");
            }
            present
        });
        if index.sandboxes.len() != before {
            index.save(&self.index_path)?;
        }
        Ok(index.sandboxes)
    }

    /// Look up one sandbox.
    ///
    /// # Errors
    ///
    /// See [`list`](Self::list).
    pub fn get(&self, sandbox_id: &str) -> SandboxResult<Option<SandboxDescriptor>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|s| s.sandbox_id == sandbox_id))
    }

    /// Delete a sandbox and its directory.
    ///
    /// Returns `false` for unknown ids and for entries whose recorded path
    /// lies outside the sandbox root. Such entries are dropped from the index
    /// but nothing on disk is touched.
    ///
    /// # Errors
    ///
    /// Returns lock, index or I/O errors.
    pub fn remove(&self, sandbox_id: &str) -> SandboxResult<bool> {
        let _lock = IndexLock::acquire(&self.lock_path)?;
        let mut index = SandboxIndex::load(&self.index_path)?;

        let Some(position) = index.position(sandbox_id) else {
            debug!(sandbox_id, "No such sandbox");
            return Ok(false);
        };
        let descriptor = index.sandboxes.remove(position);
        let deleted = self.delete_workspace(&descriptor)?;
        index.save(&self.index_path)?;

        if deleted {
            info!(sandbox_id, "Removed sandbox");
        }
        Ok(deleted)
    }

    /// Delete every sandbox. Returns what was removed, in creation order.
    ///
    /// Entries outside the sandbox root are dropped from the index without
    /// touching disk and are not reported as removed.
    ///
    /// # Errors
    ///
    /// Returns lock, index or I/O errors. Sandboxes deleted before the
    /// failure stay deleted and the index reflects it.
    pub fn purge_all(&self) -> SandboxResult<Vec<SandboxDescriptor>> {
        let _lock = IndexLock::acquire(&self.lock_path)?;
        let mut index = SandboxIndex::load(&self.index_path)?;

        let mut removed = Vec::with_capacity(index.sandboxes.len());
        while let Some(descriptor) = index.sandboxes.first() {
            match self.delete_workspace(descriptor) {
                Ok(true) => removed.push(index.sandboxes.remove(0)),
                Ok(false) => {
                    index.sandboxes.remove(0);
                },
                Err(e) => {
                    index.save(&self.index_path)?;
                    return Err(e);
                },
            }
        }
        index.save(&self.index_path)?;

        info!(count = removed.len(), "Purged sandboxes");
        Ok(removed)
    }

    fn allocate(&self, index: &SandboxIndex) -> SandboxResult<(String, PathBuf)> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let sandbox_id = generate_id();
            if index.position(&sandbox_id).is_some() {
                continue;
            }
            let path = self.root.join(&sandbox_id);
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok((sandbox_id, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(sandbox_id = %sandbox_id, "Sandbox id collision, regenerating");
                },
                Err(e) => return Err(e.into()),
            }
        }
        Err(SandboxError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique sandbox id",
        )))
    }

    /// `false` if the path is outside the root and was left alone.
    fn delete_workspace(&self, descriptor: &SandboxDescriptor) -> SandboxResult<bool> {
        if !descriptor.path.starts_with(&self.root) {
            warn!(
                sandbox_id = %descriptor.sandbox_id,
                path = %descriptor.path.display(),
                "Sandbox path is outside the sandbox root, leaving it in place"
            );
            return Ok(false);
        }
        match std::fs::remove_dir_all(&descriptor.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// `YYYYmmdd-HHMMSS-<hex>`.
fn generate_id() -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ID_SUFFIX_LEN)
        .collect();
    format!("{stamp}-{suffix}")
}

fn validate_kind(kind: &str) -> SandboxResult<()> {
    let valid = !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SandboxError::InvalidKind(kind.to_owned()))
    }
}

fn discard_workspace(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %e, "Failed to clean up sandbox directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, SandboxManager) {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectId::init(dir.path()).unwrap();
        let manager = SandboxManager::new(&project);
        (dir, manager)
    }

    fn empty(_: &Path) -> io::Result<()> {
        Ok(())
    }

    #[test]
    fn test_id_format() {
        let id = generate_id();
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_create_materialises_and_lists() {
        let (_dir, manager) = manager();
        let metadata = BTreeMap::from([("purpose".to_owned(), MetadataValue::parse("test"))]);

        let created = manager
            .create(
                DEFAULT_KIND,
                |path| std::fs::write(path.join("README.md"), "hi"),
                metadata,
            )
            .unwrap();

        assert!(created.path.join("README.md").is_file());
        assert!(created.path.starts_with(manager.root()));
        assert_eq!(created.kind, DEFAULT_KIND);

        let listed = manager.list().unwrap();
        assert_eq!(listed, [created.clone()]);
        assert_eq!(
            manager.get(&created.sandbox_id).unwrap().unwrap().metadata["purpose"],
            MetadataValue::Str("test".into())
        );
        assert!(manager.index_path().is_file());
    }

    #[test]
    fn test_two_creates_have_distinct_ids_and_paths() {
        let (_dir, manager) = manager();
        let a = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
        let b = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();

        assert_ne!(a.sandbox_id, b.sandbox_id);
        assert_ne!(a.path, b.path);
        let ids: Vec<_> = manager
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.sandbox_id)
            .collect();
        assert_eq!(ids, [a.sandbox_id, b.sandbox_id]);
    }

    #[test]
    fn test_failed_materialise_removes_directory() {
        let (_dir, manager) = manager();
        let mut seen = None;

        let err = manager
            .create(
                DEFAULT_KIND,
                |path| {
                    seen = Some(path.to_path_buf());
                    std::fs::write(path.join("partial"), "x")?;
                    Err(io::Error::other("template missing"))
                },
                BTreeMap::new(),
            )
            .unwrap_err();

        assert!(matches!(err, SandboxError::Materialise { .. }));
        assert_eq!(err.exit_code(), agentcontrol_core::exit::SANDBOX);
        assert!(!seen.unwrap().exists());
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let (_dir, manager) = manager();
        for kind in ["", "../escape", "a b"] {
            assert!(matches!(
                manager.create(kind, empty, BTreeMap::new()),
                Err(SandboxError::InvalidKind(_))
            ));
        }
    }

    #[test]
    fn test_remove_known_and_unknown() {
        let (_dir, manager) = manager();
        let created = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();

        assert!(!manager.remove("19700101-000000-000000").unwrap());
        assert!(manager.remove(&created.sandbox_id).unwrap());
        assert!(!created.path.exists());
        assert!(!manager.remove(&created.sandbox_id).unwrap());
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_entry_outside_root_is_not_reported_removed() {
        let (dir, manager) = manager();
        let outside = dir.path().join("precious");
        std::fs::create_dir_all(&outside).unwrap();
        let created = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();

        let mut index = SandboxIndex::load(manager.index_path()).unwrap();
        index.sandboxes[0].path.clone_from(&outside);
        index.save(manager.index_path()).unwrap();

        assert!(!manager.remove(&created.sandbox_id).unwrap());
        assert!(outside.is_dir());
        assert!(manager.get(&created.sandbox_id).unwrap().is_none());
    }

    #[test]
    fn test_purge_skips_entries_outside_root() {
        let (dir, manager) = manager();
        let outside = dir.path().join("precious");
        std::fs::create_dir_all(&outside).unwrap();
        let stray = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
        let kept = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();

        let mut index = SandboxIndex::load(manager.index_path()).unwrap();
        index.sandboxes[0].path.clone_from(&outside);
        index.save(manager.index_path()).unwrap();

        let removed = manager.purge_all().unwrap();
        assert_eq!(removed, [kept]);
        assert!(outside.is_dir());
        assert!(stray.path.is_dir());
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_purge_all_empties_list() {
        let (_dir, manager) = manager();
        let a = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
        let b = manager.create("review", empty, BTreeMap::new()).unwrap();

        let removed = manager.purge_all().unwrap();
        assert_eq!(removed, [a.clone(), b.clone()]);
        assert!(!a.path.exists());
        assert!(!b.path.exists());
        assert!(manager.list().unwrap().is_empty());
        assert!(manager.purge_all().unwrap().is_empty());
    }

    #[test]
    fn test_list_drops_vanished_directories() {
        let (_dir, manager) = manager();
        let gone = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
        let kept = manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
        std::fs::remove_dir_all(&gone.path).unwrap();

        assert_eq!(manager.list().unwrap(), [kept]);
        let on_disk = SandboxIndex::load(manager.index_path()).unwrap();
        assert_eq!(on_disk.sandboxes.len(), 1);
    }

    #[test]
    fn test_concurrent_creates_are_all_indexed() {
        let (_dir, manager) = manager();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for _ in 0..3 {
                        manager.create(DEFAULT_KIND, empty, BTreeMap::new()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(manager.list().unwrap().len(), 12);
    }
}
