//! Project capsule resolution.
//!
//! A project is usable only when `<root>/.agentcontrol/` exists and holds the
//! command manifest:
//!
//! ```text
//! <project>/
//! └── .agentcontrol/              (capsule)
//!     ├── agentcall.yaml          (command manifest)
//!     ├── config.toml             (optional project config)
//!     ├── plugins/                (optional project manifest plugins)
//!     ├── sandbox/                (sandbox workspaces)
//!     └── state/                  (capsule-local state, e.g. sandbox index)
//! ```
//!
//! A manifest placed directly under the root (or under a dot-less
//! `agentcontrol/` directory) belongs to the pre-capsule layout and is
//! rejected with [`ProjectError::LegacyLayout`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProjectError, ProjectResult};

/// Name of the capsule directory inside a project root.
pub const CAPSULE_DIR: &str = ".agentcontrol";

/// File name of the command manifest inside the capsule.
pub const MANIFEST_FILE: &str = "agentcall.yaml";

/// Capsule directory name used by the legacy layout.
const LEGACY_CAPSULE_DIR: &str = "agentcontrol";

/// Manifest written by [`ProjectId::init`].
const STARTER_MANIFEST: &str = "\
# AgentControl command manifest.
# Each command is a pipeline of steps; every step runs one program.
commands:
  verify:
    description: Run project verification
    steps:
      - name: hello
        exec: [\"echo\", \"agentcontrol: add your verification steps to .agentcontrol/agentcall.yaml\"]
";

/// A resolved project: its root and capsule directory.
///
/// Only obtainable through [`ProjectLocator`] or [`ProjectId::init`], so holding
/// one proves the capsule and manifest existed at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId {
    root: PathBuf,
    capsule: PathBuf,
}

impl ProjectId {
    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.agentcontrol/` capsule directory.
    #[must_use]
    pub fn capsule_dir(&self) -> &Path {
        &self.capsule
    }

    /// Path to the command manifest.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.capsule.join(MANIFEST_FILE)
    }

    /// Root directory for sandbox workspaces.
    #[must_use]
    pub fn sandbox_root(&self) -> PathBuf {
        self.capsule.join("sandbox")
    }

    /// Capsule-local state directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.capsule.join("state")
    }

    /// Project-level configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.capsule.join("config.toml")
    }

    /// Project-level manifest plugins directory.
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.capsule.join("plugins")
    }

    /// Create a capsule with a starter manifest under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::AlreadyInitialised`] if the capsule already has
    /// a manifest, or an I/O error if the files cannot be written.
    pub fn init(root: &Path) -> ProjectResult<Self> {
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        let capsule = root.join(CAPSULE_DIR);
        let manifest = capsule.join(MANIFEST_FILE);
        if manifest.exists() {
            return Err(ProjectError::AlreadyInitialised(capsule));
        }

        std::fs::create_dir_all(&capsule)?;
        std::fs::write(&manifest, STARTER_MANIFEST)?;
        debug!(root = %root.display(), "Initialised project capsule");
        Ok(Self { root, capsule })
    }
}

/// Resolves project roots into [`ProjectId`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLocator;

impl ProjectLocator {
    /// Resolve `root` as a project.
    ///
    /// Has no side effects.
    ///
    /// # Errors
    ///
    /// - [`ProjectError::LegacyLayout`] if the only manifest lives outside the
    ///   capsule.
    /// - [`ProjectError::NotInitialised`] if there is no capsule, the capsule
    ///   has no manifest, or `root` does not exist.
    pub fn resolve(root: &Path) -> ProjectResult<ProjectId> {
        let Ok(root) = root.canonicalize() else {
            return Err(ProjectError::NotInitialised {
                root: root.to_path_buf(),
            });
        };

        let capsule = root.join(CAPSULE_DIR);
        if capsule.is_dir() && capsule.join(MANIFEST_FILE).is_file() {
            debug!(root = %root.display(), "Resolved project capsule");
            return Ok(ProjectId { root, capsule });
        }

        if let Some(legacy_manifest) = legacy_candidates(&root).into_iter().find(|p| p.is_file())
        {
            return Err(ProjectError::LegacyLayout {
                root,
                legacy_manifest,
            });
        }

        Err(ProjectError::NotInitialised { root })
    }

    /// Find the nearest project by walking up from `start`.
    ///
    /// The walk stops at the first ancestor (including `start`) that is
    /// either an initialised project or a legacy layout. A `.agentcontrol/`
    /// directory without a manifest, such as the user home of the same name,
    /// does not stop it. If nothing matches, `start` itself is resolved so
    /// the caller gets the precise error.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectLocator::resolve`].
    pub fn discover(start: &Path) -> ProjectResult<ProjectId> {
        let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

        let mut current = start.as_path();
        loop {
            if is_project_root(current) {
                return Self::resolve(current);
            }
            match current.parent() {
                Some(parent) if parent != current => current = parent,
                _ => break,
            }
        }

        Self::resolve(&start)
    }
}

fn is_project_root(dir: &Path) -> bool {
    dir.join(CAPSULE_DIR).join(MANIFEST_FILE).is_file()
        || legacy_candidates(dir).iter().any(|p| p.is_file())
}

fn legacy_candidates(root: &Path) -> [PathBuf; 2] {
    [
        root.join(MANIFEST_FILE),
        root.join(LEGACY_CAPSULE_DIR).join(MANIFEST_FILE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_capsule_manifest(root: &Path) {
        let capsule = root.join(CAPSULE_DIR);
        std::fs::create_dir_all(&capsule).unwrap();
        std::fs::write(capsule.join(MANIFEST_FILE), "commands: {}\n").unwrap();
    }

    #[test]
    fn test_resolve_valid_capsule() {
        let dir = tempfile::tempdir().unwrap();
        write_capsule_manifest(dir.path());

        let project = ProjectLocator::resolve(dir.path()).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(project.root(), root);
        assert_eq!(project.capsule_dir(), root.join(".agentcontrol"));
        assert_eq!(
            project.manifest_path(),
            root.join(".agentcontrol").join("agentcall.yaml")
        );
    }

    #[test]
    fn test_resolve_missing_capsule() {
        let dir = tempfile::tempdir().unwrap();

        let err = ProjectLocator::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotInitialised { .. }));
        assert!(err.is_not_initialised());
    }

    #[test]
    fn test_resolve_capsule_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(CAPSULE_DIR)).unwrap();

        let err = ProjectLocator::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotInitialised { .. }));
    }

    #[test]
    fn test_resolve_rejects_legacy_root_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "commands: {}\n").unwrap();

        let err = ProjectLocator::resolve(dir.path()).unwrap_err();
        match &err {
            ProjectError::LegacyLayout {
                legacy_manifest, ..
            } => assert!(legacy_manifest.ends_with(MANIFEST_FILE)),
            other => panic!("expected LegacyLayout, got {other:?}"),
        }
        assert!(err.is_not_initialised());
        assert_eq!(err.exit_code(), crate::exit::PROJECT_NOT_INITIALISED);
    }

    #[test]
    fn test_resolve_rejects_legacy_dotless_capsule() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("agentcontrol");
        std::fs::create_dir(&legacy).unwrap();
        std::fs::write(legacy.join(MANIFEST_FILE), "commands: {}\n").unwrap();

        let err = ProjectLocator::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::LegacyLayout { .. }));
    }

    #[test]
    fn test_resolve_nonexistent_root() {
        let err = ProjectLocator::resolve(Path::new("/nonexistent/agentcontrol/project"))
            .unwrap_err();
        assert!(matches!(err, ProjectError::NotInitialised { .. }));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        write_capsule_manifest(dir.path());
        let sub = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&sub).unwrap();

        let project = ProjectLocator::discover(&sub).unwrap();
        assert_eq!(project.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_without_capsule_reports_start() {
        let dir = tempfile::tempdir().unwrap();
        let isolated = dir.path().join("isolated");
        std::fs::create_dir(&isolated).unwrap();

        let err = ProjectLocator::discover(&isolated).unwrap_err();
        match err {
            ProjectError::NotInitialised { root } => {
                assert_eq!(root, isolated.canonicalize().unwrap());
            },
            other => panic!("expected NotInitialised, got {other:?}"),
        }
    }

    #[test]
    fn test_discover_skips_capsule_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CAPSULE_DIR).join("state")).unwrap();
        let legacy = dir.path().join("work").join("legacy");
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(legacy.join(MANIFEST_FILE), "commands: {}\n").unwrap();

        let err = ProjectLocator::discover(&legacy).unwrap_err();
        match err {
            ProjectError::LegacyLayout { root, .. } => {
                assert_eq!(root, legacy.canonicalize().unwrap());
            },
            other => panic!("expected LegacyLayout, got {other:?}"),
        }
    }

    #[test]
    fn test_discover_finds_project_above_manifestless_capsule() {
        let dir = tempfile::tempdir().unwrap();
        write_capsule_manifest(dir.path());
        let nested = dir.path().join("sub");
        std::fs::create_dir_all(nested.join(CAPSULE_DIR)).unwrap();

        let project = ProjectLocator::discover(&nested).unwrap();
        assert_eq!(project.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_init_creates_resolvable_capsule() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");

        let created = ProjectId::init(&root).unwrap();
        assert!(created.manifest_path().is_file());

        let resolved = ProjectLocator::resolve(&root).unwrap();
        assert_eq!(created, resolved);
    }

    #[test]
    fn test_init_refuses_existing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_capsule_manifest(dir.path());

        let err = ProjectId::init(dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyInitialised(_)));
    }

    #[test]
    fn test_capsule_path_accessors() {
        let dir = tempfile::tempdir().unwrap();
        write_capsule_manifest(dir.path());
        let project = ProjectLocator::resolve(dir.path()).unwrap();
        let capsule = project.capsule_dir().to_path_buf();

        assert_eq!(project.sandbox_root(), capsule.join("sandbox"));
        assert_eq!(project.state_dir(), capsule.join("state"));
        assert_eq!(project.config_path(), capsule.join("config.toml"));
        assert_eq!(project.plugins_dir(), capsule.join("plugins"));
    }
}
