//! AgentControl Core - Foundation types for the command orchestrator.
//!
//! This crate provides:
//! - [`RuntimeSettings`]: process-wide directories and version, resolved once
//!   at startup and threaded explicitly through every component
//! - [`ProjectLocator`] / [`ProjectId`]: resolution of the `.agentcontrol/`
//!   project capsule and its command manifest
//! - [`PluginContext`]: the read-only snapshot handed to plugins at
//!   registration time
//! - [`exit`]: the fixed exit-code table shared by every error kind

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod context;
pub mod error;
pub mod exit;
pub mod project;
pub mod settings;

pub use context::PluginContext;
pub use error::{ProjectError, ProjectResult};
pub use project::{CAPSULE_DIR, MANIFEST_FILE, ProjectId, ProjectLocator};
pub use settings::RuntimeSettings;
