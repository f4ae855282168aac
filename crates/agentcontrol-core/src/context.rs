//! Plugin context.

use std::path::Path;
use std::sync::Arc;

use crate::settings::RuntimeSettings;

/// Read-only snapshot of [`RuntimeSettings`] handed to every plugin.
///
/// Built once per load and shared by reference; cloning is cheap and never
/// copies the settings.
#[derive(Debug, Clone)]
pub struct PluginContext {
    settings: Arc<RuntimeSettings>,
}

impl PluginContext {
    /// Snapshot `settings` into a new context.
    #[must_use]
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// The settings this context was built from.
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Version string of the running CLI.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.settings.version
    }

    /// Home directory.
    #[must_use]
    pub fn home_dir(&self) -> &Path {
        &self.settings.home_dir
    }
}
