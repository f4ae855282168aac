//! `AgentControl` Plugins - discovery and loading of command plugins.
//!
//! Plugins contribute named commands to the same [`CommandRegistry`] that
//! holds the project's manifest pipelines. This crate provides:
//! - [`Plugin`] and [`PluginDescriptor`]: the registration protocol
//! - [`PluginDiscovery`] with [`StaticDiscovery`] (compiled-in plugins) and
//!   [`ManifestDiscovery`] (`plugin.toml` directories)
//! - [`PluginLoader`]: runs each entry point once under a [`FailurePolicy`]
//!
//! [`CommandRegistry`]: agentcontrol_commands::CommandRegistry

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod builtin;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod plugin;

pub use discovery::{BUILTIN_ORIGIN, ManifestDiscovery, PluginDiscovery, StaticDiscovery};
pub use error::{PluginError, PluginResult};
pub use loader::{FailurePolicy, LoadReport, PluginFailure, PluginLoader};
pub use manifest::PluginManifest;
pub use plugin::{PLUGIN_GROUP, Plugin, PluginDescriptor, RegisterFn};
