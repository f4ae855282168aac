//! Plugin error types.

use std::path::PathBuf;

use agentcontrol_commands::CommandError;
use agentcontrol_core::exit;

/// Errors from plugin discovery and loading.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Failed to read or parse a plugin manifest file.
    #[error("manifest parse error in {}: {message}", path.display())]
    ManifestParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// A plugin manifest parsed but declares something unusable.
    #[error("invalid plugin manifest {}: {message}", path.display())]
    InvalidManifest {
        /// Path to the manifest file.
        path: PathBuf,
        /// What is wrong.
        message: String,
    },

    /// A registration call against the command registry failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A plugin's registration hook failed.
    #[error("plugin load failed: {plugin} - {source}")]
    LoadFailed {
        /// The plugin that failed to load.
        plugin: String,
        /// Failure reason.
        source: Box<PluginError>,
    },

    /// A plugin-specific failure.
    #[error("plugin error: {0}")]
    Custom(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Name of the plugin this error belongs to, if known.
    #[must_use]
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::LoadFailed { plugin, .. } => Some(plugin),
            _ => None,
        }
    }

    /// Process exit code for this error.
    ///
    /// Name collisions keep their own code even when wrapped.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Command(CommandError::Collision(_)) => exit::COMMAND_COLLISION,
            Self::LoadFailed { source, .. } => match source.as_ref() {
                Self::Command(CommandError::Collision(_)) => exit::COMMAND_COLLISION,
                _ => exit::PLUGIN_LOAD,
            },
            Self::Io(_) => exit::INTERNAL,
            _ => exit::PLUGIN_LOAD,
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
