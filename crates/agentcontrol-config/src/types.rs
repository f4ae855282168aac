use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The unified configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging output.
    pub logging: LoggingSection,
    /// Pipeline execution.
    pub executor: ExecutorSection,
    /// Plugin loading.
    pub plugins: PluginsSection,
    /// Sandbox defaults.
    pub sandbox: SandboxSection,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive (e.g. `"info"`, `"agentcontrol_commands=debug"`).
    pub level: String,
    /// One of `pretty`, `compact`, `json`.
    pub format: String,
    /// Write daily-rotated files into the home log directory instead of
    /// stderr.
    pub to_file: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            to_file: false,
        }
    }
}

/// `[executor]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// Per-step deadline in seconds; `0` disables it.
    pub default_timeout_secs: u64,
    /// Extra environment variables exported to every step.
    pub env: BTreeMap<String, String>,
}

/// How the plugin loader reacts to a failing registration hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginFailurePolicy {
    /// Abort the whole load on the first failure.
    #[default]
    Abort,
    /// Roll back the failing plugin and continue.
    Isolate,
}

/// `[plugins]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// Failure policy for registration hooks.
    pub failure_policy: PluginFailurePolicy,
    /// Additional directories scanned for `plugin.toml` manifests.
    pub extra_dirs: Vec<PathBuf>,
}

/// `[sandbox]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Kind label used when `sandbox create` gets no `--kind`.
    pub default_kind: String,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            default_kind: "sandbox".to_owned(),
        }
    }
}
