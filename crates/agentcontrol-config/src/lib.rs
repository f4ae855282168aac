#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the AgentControl orchestrator.
//!
//! # Usage
//!
//! ```rust,no_run
//! use agentcontrol_config::Config;
//!
//! let resolved = Config::load(
//!     Some(std::path::Path::new("/home/dev/.agentcontrol/config.toml")),
//!     Some(std::path::Path::new("./.agentcontrol/config.toml")),
//! )
//! .unwrap();
//! println!("log level: {}", resolved.config.logging.level);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`AGENTCONTROL_LOG_LEVEL`, `AGENTCONTROL_STEP_TIMEOUT`)
//! 2. **Project** (`<project>/.agentcontrol/config.toml`)
//! 3. **User** (`~/.agentcontrol/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal crates**. Conversion
//! from config sections to domain types happens in the CLI's bridge module.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Deep merge of TOML layers.
pub mod merge;
/// Configuration struct definitions.
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration from the user and project layers plus the process
    /// environment.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(
        user_config: Option<&std::path::Path>,
        project_config: Option<&std::path::Path>,
    ) -> ConfigResult<ResolvedConfig> {
        let env = loader::collect_env_vars();
        loader::load(user_config, project_config, &env)
    }
}
