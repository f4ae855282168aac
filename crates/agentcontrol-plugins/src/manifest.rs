//! `plugin.toml` manifests for plugins that run external programs.
//!
//! ```toml
//! [plugin]
//! name = "deploy-tools"
//! version = "0.3.0"
//! description = "Deployment helpers"
//!
//! [[commands]]
//! name = "deploy"
//! help = "Deploy the current project"
//! exec = ["./bin/deploy.sh", "--verbose"]
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use agentcontrol_commands::{BuiltCommand, RegisteredCommand};
use agentcontrol_core::PluginContext;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::plugin::{PLUGIN_GROUP, PluginDescriptor};

/// Standard plugin manifest file name.
pub const MANIFEST_FILE_NAME: &str = "plugin.toml";

/// Maximum allowed manifest size (1 MB).
const MAX_MANIFEST_SIZE: u64 = 1_048_576;

/// Plugin directory exported to external commands.
pub const PLUGIN_DIR_VAR: &str = "AGENTCONTROL_PLUGIN_DIR";

/// Parsed `plugin.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// `[plugin]` table.
    pub plugin: PluginSection,
    /// `[[commands]]` entries.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// `[plugin]`
#[derive(Debug, Clone, Deserialize)]
pub struct PluginSection {
    /// Plugin name.
    pub name: String,
    /// Version string.
    #[serde(default)]
    pub version: Option<String>,
    /// One-line summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Extension-point group.
    #[serde(default = "default_group")]
    pub group: String,
}

fn default_group() -> String {
    PLUGIN_GROUP.to_owned()
}

/// One `[[commands]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Command name.
    pub name: String,
    /// Listing text.
    #[serde(default)]
    pub help: Option<String>,
    /// Program and fixed arguments. Relative program paths containing a
    /// separator resolve against the plugin directory.
    pub exec: Vec<String>,
}

impl PluginManifest {
    /// Read and parse a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestParseError`] if the file cannot be read
    /// or parsed, and [`PluginError::InvalidManifest`] if it declares an
    /// unusable command.
    pub fn load(path: &Path) -> PluginResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PluginError::ManifestParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if content.len() as u64 > MAX_MANIFEST_SIZE {
            return Err(PluginError::ManifestParseError {
                path: path.to_path_buf(),
                message: format!(
                    "manifest is {} bytes, exceeding the {MAX_MANIFEST_SIZE} byte limit",
                    content.len()
                ),
            });
        }

        let manifest: Self = toml::from_str(&content).map_err(|e| PluginError::ManifestParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> PluginResult<()> {
        let invalid = |message: String| PluginError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        if self.plugin.name.trim().is_empty() {
            return Err(invalid("plugin name is empty".to_owned()));
        }
        for command in &self.commands {
            if command.name.trim().is_empty() {
                return Err(invalid("command name is empty".to_owned()));
            }
            if command.exec.first().is_none_or(String::is_empty) {
                return Err(invalid(format!("command {} has an empty exec", command.name)));
            }
        }
        Ok(())
    }

    /// Convert into a descriptor. A manifest without commands has no entry
    /// point.
    #[must_use]
    pub fn into_descriptor(self, plugin_dir: &Path, manifest_path: &Path) -> PluginDescriptor {
        let mut descriptor =
            PluginDescriptor::new(&self.plugin.name, manifest_path.display().to_string())
                .with_group(self.plugin.group);
        if let Some(version) = self.plugin.version {
            descriptor = descriptor.with_version(version);
        }
        if let Some(summary) = self.plugin.description {
            descriptor = descriptor.with_summary(summary);
        }
        if self.commands.is_empty() {
            return descriptor;
        }

        let plugin_name = self.plugin.name;
        let plugin_dir = plugin_dir.to_path_buf();
        let commands = self.commands;
        descriptor.with_register(move |registrar, _ctx| {
            for spec in &commands {
                registrar.register(external_command(&plugin_name, &plugin_dir, spec))?;
            }
            Ok(())
        })
    }
}

/// A registered command that runs `spec.exec` plus the user's arguments.
fn external_command(plugin: &str, plugin_dir: &Path, spec: &CommandSpec) -> RegisteredCommand {
    let help = spec
        .help
        .clone()
        .unwrap_or_else(|| format!("Run {} from plugin {plugin}", spec.name));
    let exec = resolve_exec(plugin_dir, &spec.exec);
    let plugin_dir = plugin_dir.to_path_buf();
    let name = spec.name.clone();

    RegisteredCommand::new(&spec.name, help, move |command, ctx: &PluginContext| {
        let command = command.arg(
            clap::Arg::new("args")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Arguments passed to the plugin program"),
        );
        let exec = exec.clone();
        let plugin_dir = plugin_dir.clone();
        let name = name.clone();
        let home = ctx.home_dir().to_path_buf();
        let version = ctx.version().to_owned();

        BuiltCommand::new(command, move |matches| {
            let extra: Vec<String> = matches
                .get_many::<String>("args")
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default();
            run_external(&name, &exec, &extra, &plugin_dir, &home, &version)
        })
    })
    .with_source(plugin)
}

fn resolve_exec(plugin_dir: &Path, exec: &[String]) -> Vec<String> {
    let mut resolved = exec.to_vec();
    if let Some(program) = resolved.first_mut() {
        let path = Path::new(program.as_str());
        if path.is_relative() && path.components().count() > 1 {
            *program = plugin_dir.join(path).display().to_string();
        }
    }
    resolved
}

fn run_external(
    name: &str,
    exec: &[String],
    extra: &[String],
    plugin_dir: &Path,
    home: &Path,
    version: &str,
) -> i32 {
    let Some((program, fixed)) = exec.split_first() else {
        return agentcontrol_core::exit::INTERNAL;
    };
    debug!(command = name, program, "running plugin command");

    let status = Command::new(program)
        .args(fixed)
        .args(extra)
        .env("AGENTCONTROL_HOME", home)
        .env("AGENTCONTROL_VERSION", version)
        .env(PLUGIN_DIR_VAR, plugin_dir)
        .status();

    match status {
        Ok(status) => status
            .code()
            .unwrap_or(agentcontrol_core::exit::STEP_FAILED),
        Err(e) => {
            warn!(command = name, program, error = %e, "failed to spawn plugin command");
            eprintln!("failed to run {name}: {program}: {e}");
            agentcontrol_core::exit::STEP_FAILED
        },
    }
}

/// Directory containing `manifest_path`.
pub(crate) fn plugin_dir_of(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
