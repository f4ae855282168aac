//! Runtime settings for the orchestrator.
//!
//! [`RuntimeSettings`] is constructed exactly once at process start and then
//! passed by reference (or cloned into a [`PluginContext`](crate::PluginContext))
//! to every component that needs a directory or the version string. There is
//! no ambient global.
//!
//! # Layout
//!
//! ```text
//! ~/.agentcontrol/                (home, or $AGENTCONTROL_HOME)
//! ├── templates/                  (template bundles, managed externally)
//! ├── state/                      (per-project state, keyed by root hash)
//! │   └── <hash>/
//! ├── logs/                       (log files, events.jsonl)
//! ├── plugins/                    (manifest plugins: */plugin.toml)
//! └── config.toml                 (user configuration)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Environment variable that overrides the home directory.
pub const HOME_ENV: &str = "AGENTCONTROL_HOME";

/// Directory name used under the user's home when no override is set.
const DEFAULT_HOME_DIR: &str = ".agentcontrol";

/// Length of the hex prefix used to key per-project state directories.
const STATE_KEY_LEN: usize = 16;

/// Directories and version shared by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeSettings {
    /// Home directory.
    pub home_dir: PathBuf,
    /// Template bundle directory.
    pub template_dir: PathBuf,
    /// State directory.
    pub state_dir: PathBuf,
    /// Log directory.
    pub log_dir: PathBuf,
    /// Version string of the running CLI.
    pub version: String,
}

impl RuntimeSettings {
    /// Resolve settings from the environment.
    ///
    /// Checks `$AGENTCONTROL_HOME` first, then falls back to
    /// `~/.agentcontrol/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$AGENTCONTROL_HOME` is set to a relative or empty
    /// path, or if no home directory can be determined.
    pub fn resolve() -> io::Result<Self> {
        let override_home = std::env::var(HOME_ENV).ok();
        let user_home = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
        Self::resolve_from(override_home.as_deref(), user_home)
    }

    /// Resolve settings from explicit inputs instead of the process environment.
    fn resolve_from(override_home: Option<&str>, user_home: Option<PathBuf>) -> io::Result<Self> {
        let home = if let Some(custom) = override_home {
            let p = PathBuf::from(custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "AGENTCONTROL_HOME must be an absolute path",
                ));
            }
            p
        } else {
            user_home
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        "neither AGENTCONTROL_HOME nor a user home directory is available",
                    )
                })?
                .join(DEFAULT_HOME_DIR)
        };

        Ok(Self::from_home(home))
    }

    /// Build settings rooted at an explicit home directory (useful for testing).
    #[must_use]
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home_dir = home.into();
        Self {
            template_dir: home_dir.join("templates"),
            state_dir: home_dir.join("state"),
            log_dir: home_dir.join("logs"),
            home_dir,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Override the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Create the state and log directories if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// User-level configuration file (`<home>/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.home_dir.join("config.toml")
    }

    /// Installed manifest plugins (`<home>/plugins/`).
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.home_dir.join("plugins")
    }

    /// Per-project state directory (`<state>/<hash-of-root>/`).
    ///
    /// The key is the first 16 hex characters of the blake3 digest of the
    /// project root path, so two checkouts never share state.
    #[must_use]
    pub fn project_state_dir(&self, project_root: &Path) -> PathBuf {
        let digest = blake3::hash(project_root.to_string_lossy().as_bytes()).to_hex();
        let key = digest.get(..STATE_KEY_LEN).unwrap_or(digest.as_str());
        self.state_dir.join(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let settings = RuntimeSettings::resolve_from(Some(path), None).unwrap();
        assert_eq!(settings.home_dir, dir.path());
        assert_eq!(settings.template_dir, dir.path().join("templates"));
        assert_eq!(settings.state_dir, dir.path().join("state"));
        assert_eq!(settings.log_dir, dir.path().join("logs"));
    }

    #[test]
    fn test_resolve_default_home() {
        let settings =
            RuntimeSettings::resolve_from(None, Some(PathBuf::from("/home/dev"))).unwrap();
        assert_eq!(settings.home_dir, PathBuf::from("/home/dev/.agentcontrol"));
    }

    #[test]
    fn test_resolve_rejects_relative_override() {
        let err = RuntimeSettings::resolve_from(Some("relative/path"), None).unwrap_err();
        assert!(
            err.to_string().contains("absolute"),
            "expected absolute path error, got: {err}"
        );
    }

    #[test]
    fn test_resolve_rejects_empty_override() {
        assert!(RuntimeSettings::resolve_from(Some(""), None).is_err());
    }

    #[test]
    fn test_resolve_without_any_home() {
        let err = RuntimeSettings::resolve_from(None, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_version_defaults_to_crate_version() {
        let settings = RuntimeSettings::from_home("/tmp/ac");
        assert_eq!(settings.version, env!("CARGO_PKG_VERSION"));

        let settings = settings.with_version("9.9.9");
        assert_eq!(settings.version, "9.9.9");
    }

    #[test]
    fn test_ensure_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RuntimeSettings::from_home(dir.path());
        settings.ensure().unwrap();

        assert!(settings.state_dir.is_dir());
        assert!(settings.log_dir.is_dir());
    }

    #[test]
    fn test_path_accessors() {
        let settings = RuntimeSettings::from_home("/tmp/ac");
        assert_eq!(settings.config_path(), PathBuf::from("/tmp/ac/config.toml"));
        assert_eq!(settings.plugins_dir(), PathBuf::from("/tmp/ac/plugins"));
    }

    #[test]
    fn test_project_state_dir_is_stable_and_distinct() {
        let settings = RuntimeSettings::from_home("/tmp/ac");
        let a = settings.project_state_dir(Path::new("/work/a"));
        let a_again = settings.project_state_dir(Path::new("/work/a"));
        let b = settings.project_state_dir(Path::new("/work/b"));

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp/ac/state"));
        let key = a.file_name().unwrap().to_str().unwrap();
        assert_eq!(key.len(), STATE_KEY_LEN);
    }
}
