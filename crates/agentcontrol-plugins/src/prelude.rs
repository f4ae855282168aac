//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentcontrol_plugins::prelude::*;` to import all essential types.

// Errors
pub use crate::{PluginError, PluginResult};

// Protocol
pub use crate::{PLUGIN_GROUP, Plugin, PluginDescriptor};

// Discovery and loading
pub use crate::{FailurePolicy, ManifestDiscovery, PluginDiscovery, PluginLoader, StaticDiscovery};
