//! Isolated home and project directories.
//!
//! Fixture constructors panic on I/O failure; they only run inside tests.

#![allow(clippy::missing_panics_doc)]

use std::path::{Path, PathBuf};

use agentcontrol_core::{ProjectId, ProjectLocator, RuntimeSettings};
use tempfile::TempDir;

/// Version string reported by fixture settings.
pub const TEST_VERSION: &str = "0.0.0-test";

/// A home directory in a temp dir with matching [`RuntimeSettings`].
pub struct TestHome {
    dir: TempDir,
    settings: RuntimeSettings,
}

impl TestHome {
    /// Create the home and its state/log directories.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp home");
        let settings = RuntimeSettings::from_home(dir.path()).with_version(TEST_VERSION);
        settings.ensure().expect("failed to create home directories");
        Self { dir, settings }
    }

    /// Home directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Settings rooted at this home.
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Write `<home>/config.toml`.
    pub fn write_config(&self, body: &str) -> PathBuf {
        let path = self.settings.config_path();
        std::fs::write(&path, body).expect("failed to write user config");
        path
    }

    /// Create a template bundle `<home>/templates/<kind>/` with one file.
    pub fn write_template(&self, kind: &str, file: &str, body: &str) -> PathBuf {
        let dir = self.settings.template_dir.join(kind);
        std::fs::create_dir_all(&dir).expect("failed to create template dir");
        std::fs::write(dir.join(file), body).expect("failed to write template file");
        dir
    }
}

impl Default for TestHome {
    fn default() -> Self {
        Self::new()
    }
}

/// A project root in a temp dir with an initialised capsule.
pub struct TestProject {
    dir: TempDir,
    id: ProjectId,
}

impl TestProject {
    /// A project with the starter manifest.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp project");
        let id = ProjectId::init(dir.path()).expect("failed to initialise project");
        Self { dir, id }
    }

    /// A project whose manifest is `manifest`.
    #[must_use]
    pub fn with_manifest(manifest: &str) -> Self {
        let project = Self::new();
        project.write_manifest(manifest);
        project
    }

    /// Replace the manifest.
    pub fn write_manifest(&self, manifest: &str) {
        std::fs::write(self.id.manifest_path(), manifest).expect("failed to write manifest");
    }

    /// Project root (canonical).
    #[must_use]
    pub fn root(&self) -> &Path {
        self.id.root()
    }

    /// The resolved project.
    #[must_use]
    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    /// Resolve the project again through [`ProjectLocator`].
    #[must_use]
    pub fn resolve(&self) -> ProjectId {
        ProjectLocator::resolve(self.dir.path()).expect("fixture project should resolve")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
