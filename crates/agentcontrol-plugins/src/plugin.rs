//! Plugin trait and descriptors.

use std::fmt;
use std::sync::Arc;

use agentcontrol_commands::CommandRegistrar;
use agentcontrol_core::PluginContext;

use crate::error::PluginResult;

/// Extension-point group every loadable plugin is published under.
pub const PLUGIN_GROUP: &str = "agentcontrol.plugins";

/// A registration entry point: adds commands to the registrar.
pub type RegisterFn =
    Arc<dyn Fn(&mut dyn CommandRegistrar, &PluginContext) -> PluginResult<()> + Send + Sync>;

/// A source of commands.
pub trait Plugin: Send + Sync {
    /// Stable plugin name.
    fn name(&self) -> &str;

    /// Register this plugin's commands.
    ///
    /// # Errors
    ///
    /// Returns an error if a command cannot be registered, most commonly a
    /// name collision.
    fn register(&self, registrar: &mut dyn CommandRegistrar, ctx: &PluginContext)
    -> PluginResult<()>;
}

/// A discovered plugin, before loading.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Plugin name.
    pub name: String,
    /// Extension-point group.
    pub group: String,
    /// Where the plugin came from (`builtin`, a manifest path, ...).
    pub origin: String,
    /// Version string, if the plugin declares one.
    pub version: Option<String>,
    /// One-line summary, if the plugin declares one.
    pub summary: Option<String>,
    /// Registration entry point. `None` means there is nothing to load.
    pub register: Option<RegisterFn>,
}

impl PluginDescriptor {
    /// A descriptor in [`PLUGIN_GROUP`] with no entry point.
    #[must_use]
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: PLUGIN_GROUP.to_owned(),
            origin: origin.into(),
            version: None,
            summary: None,
            register: None,
        }
    }

    /// Wrap a [`Plugin`] implementation.
    #[must_use]
    pub fn from_plugin(plugin: Arc<dyn Plugin>, origin: impl Into<String>) -> Self {
        let name = plugin.name().to_owned();
        Self::new(name, origin)
            .with_register(move |registrar, ctx| plugin.register(registrar, ctx))
    }

    /// Set the registration entry point.
    #[must_use]
    pub fn with_register<F>(mut self, register: F) -> Self
    where
        F: Fn(&mut dyn CommandRegistrar, &PluginContext) -> PluginResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.register = Some(Arc::new(register));
        self
    }

    /// Publish under a different group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Whether the descriptor has an entry point.
    #[must_use]
    pub fn is_loadable(&self) -> bool {
        self.register.is_some()
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("origin", &self.origin)
            .field("version", &self.version)
            .field("loadable", &self.is_loadable())
            .finish_non_exhaustive()
    }
}
