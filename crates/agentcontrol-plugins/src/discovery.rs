//! Plugin discovery strategies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentcontrol_core::{ProjectId, RuntimeSettings};
use tracing::{debug, info, warn};

use crate::builtin::HelloPlugin;
use crate::error::PluginResult;
use crate::manifest::{MANIFEST_FILE_NAME, PluginManifest, plugin_dir_of};
use crate::plugin::{Plugin, PluginDescriptor};

/// Origin label for compiled-in plugins.
pub const BUILTIN_ORIGIN: &str = "builtin";

/// Enumerates installed plugins.
pub trait PluginDiscovery: Send + Sync {
    /// All plugins this source knows about. Order carries no meaning.
    ///
    /// # Errors
    ///
    /// Returns an error only when the source as a whole is unusable; broken
    /// individual plugins are skipped.
    fn discover(&self) -> PluginResult<Vec<PluginDescriptor>>;
}

/// A fixed table of compiled-in plugins.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    descriptors: Vec<PluginDescriptor>,
}

impl StaticDiscovery {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The plugins shipped with the CLI.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new().with_plugin(Arc::new(HelloPlugin))
    }

    /// Add a plugin implementation.
    #[must_use]
    pub fn with_plugin(self, plugin: Arc<dyn Plugin>) -> Self {
        self.with_descriptor(PluginDescriptor::from_plugin(plugin, BUILTIN_ORIGIN))
    }

    /// Add a prepared descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: PluginDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }
}

impl PluginDiscovery for StaticDiscovery {
    fn discover(&self) -> PluginResult<Vec<PluginDescriptor>> {
        Ok(self.descriptors.clone())
    }
}

/// Scans plugin directories for `plugin.toml` manifests.
///
/// Each directory is searched for a `plugin.toml` directly inside it and in
/// each immediate subdirectory. Missing directories are ignored and broken
/// manifests are logged and skipped.
#[derive(Debug, Clone, Default)]
pub struct ManifestDiscovery {
    dirs: Vec<PathBuf>,
}

impl ManifestDiscovery {
    /// Scan exactly `dirs`.
    #[must_use]
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// The standard locations: `<home>/plugins`, the project capsule's
    /// `plugins/` when a project is known, then `extra`.
    #[must_use]
    pub fn standard(settings: &RuntimeSettings, project: Option<&ProjectId>, extra: &[PathBuf]) -> Self {
        let mut dirs = vec![settings.plugins_dir()];
        if let Some(project) = project {
            dirs.push(project.plugins_dir());
        }
        dirs.extend(extra.iter().cloned());
        Self::new(dirs)
    }

    /// Directories this discovery scans.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl PluginDiscovery for ManifestDiscovery {
    fn discover(&self) -> PluginResult<Vec<PluginDescriptor>> {
        let mut found = Vec::new();
        for dir in &self.dirs {
            if !dir.is_dir() {
                debug!(path = %dir.display(), "plugin directory not present, skipping");
                continue;
            }
            info!(path = %dir.display(), "Discovering plugins");
            match manifests_in(dir) {
                Ok(paths) => {
                    for path in paths {
                        if let Some(descriptor) = load_descriptor(&path) {
                            found.push(descriptor);
                        }
                    }
                },
                Err(e) => warn!(path = %dir.display(), error = %e, "Failed to scan plugin directory"),
            }
        }
        debug!(count = found.len(), "Discovered plugin manifests");
        Ok(found)
    }
}

fn manifests_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    let direct = dir.join(MANIFEST_FILE_NAME);
    if direct.is_file() {
        paths.push(direct);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    paths.extend(
        subdirs
            .into_iter()
            .map(|sub| sub.join(MANIFEST_FILE_NAME))
            .filter(|path| path.is_file()),
    );
    Ok(paths)
}

fn load_descriptor(path: &Path) -> Option<PluginDescriptor> {
    match PluginManifest::load(path) {
        Ok(manifest) => {
            debug!(
                path = %path.display(),
                plugin = %manifest.plugin.name,
                "Loaded plugin manifest"
            );
            Some(manifest.into_descriptor(&plugin_dir_of(path), path))
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load plugin manifest");
            None
        },
    }
}
