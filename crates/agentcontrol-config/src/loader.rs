//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.agentcontrol/config.toml` (user)
//! 3. Merge `<project>/.agentcontrol/config.toml` (project)
//! 4. Apply environment overrides
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{deep_merge, set_path};
use crate::types::Config;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "AGENTCONTROL_LOG_LEVEL";
/// Overrides `executor.default_timeout_secs`.
pub const STEP_TIMEOUT_ENV: &str = "AGENTCONTROL_STEP_TIMEOUT";

/// Accepted values for `logging.format`.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// A fully merged configuration plus the files that contributed to it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Files that were found and merged, lowest precedence first.
    pub loaded_files: Vec<String>,
}

/// Snapshot the `AGENTCONTROL_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("AGENTCONTROL_"))
        .collect()
}

/// Load the configuration with layered file precedence.
///
/// Either layer may be `None` or point at a file that does not exist; both
/// cases are skipped silently.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, an environment
/// override has the wrong type, or the final configuration fails validation.
pub fn load(
    user_config: Option<&Path>,
    project_config: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    for (layer, path) in [("user", user_config), ("project", project_config)] {
        let Some(path) = path else {
            continue;
        };
        if let Some(overlay) = try_load_file(path)? {
            deep_merge(&mut merged, &overlay);
            loaded_files.push(path.display().to_string());
            info!(layer, path = %path.display(), "loaded config");
        }
    }

    apply_env_overrides(&mut merged, env_vars)?;

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(level) = env_vars.get(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
        set_path(merged, "logging.level", toml::Value::String(level.trim().to_owned()));
        debug!(var = LOG_LEVEL_ENV, "applied environment override");
    }

    if let Some(raw) = env_vars.get(STEP_TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
        let secs: i64 = raw
            .trim()
            .parse()
            .ok()
            .filter(|v: &i64| *v >= 0)
            .ok_or_else(|| ConfigError::ValidationError {
                field: STEP_TIMEOUT_ENV.to_owned(),
                message: format!("expected a non-negative integer, got {raw:?}"),
            })?;
        set_path(
            merged,
            "executor.default_timeout_secs",
            toml::Value::Integer(secs),
        );
        debug!(var = STEP_TIMEOUT_ENV, "applied environment override");
    }

    Ok(())
}

/// Check cross-field constraints serde cannot express.
fn validate(config: &Config) -> ConfigResult<()> {
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unknown format {:?}, expected one of {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    for key in config.executor.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(ConfigError::ValidationError {
                field: format!("executor.env.{key}"),
                message: "not a valid environment variable name".to_owned(),
            });
        }
    }

    let kind = &config.sandbox.default_kind;
    if kind.is_empty()
        || !kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::ValidationError {
            field: "sandbox.default_kind".to_owned(),
            message: format!("{kind:?} must be non-empty and use only [A-Za-z0-9_-]"),
        });
    }

    Ok(())
}
