//! Plugin loading.
//!
//! Enumerates every discovery source, keeps descriptors published under
//! [`PLUGIN_GROUP`], and calls each entry point once against the command
//! registry with a single shared [`PluginContext`].

use agentcontrol_commands::CommandRegistry;
use agentcontrol_core::{PluginContext, RuntimeSettings};
use tracing::{debug, info, warn};

use crate::discovery::PluginDiscovery;
use crate::error::{PluginError, PluginResult};
use crate::plugin::{PLUGIN_GROUP, PluginDescriptor};

/// What to do when a plugin's registration hook fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop loading and return the error.
    #[default]
    Abort,
    /// Roll back the plugin's partial registrations, warn, and continue.
    Isolate,
}

/// A plugin that failed under [`FailurePolicy::Isolate`].
#[derive(Debug)]
pub struct PluginFailure {
    /// Plugin name.
    pub plugin: String,
    /// What went wrong.
    pub error: PluginError,
    /// Commands that were rolled back.
    pub rolled_back: Vec<String>,
}

/// Summary of one load.
#[derive(Debug)]
pub struct LoadReport {
    /// The context every plugin received. Reuse it to build commands.
    pub context: PluginContext,
    /// Plugins whose entry point ran successfully.
    pub loaded: Vec<String>,
    /// Plugins without an entry point.
    pub skipped: Vec<String>,
    /// Plugins that failed and were isolated.
    pub failed: Vec<PluginFailure>,
}

/// Discovers plugins and runs their registration hooks.
pub struct PluginLoader {
    sources: Vec<Box<dyn PluginDiscovery>>,
    policy: FailurePolicy,
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginLoader {
    /// A loader with no discovery sources and [`FailurePolicy::Abort`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            policy: FailurePolicy::default(),
        }
    }

    /// Add a discovery source.
    #[must_use]
    pub fn with_discovery(mut self, source: impl PluginDiscovery + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The failure policy.
    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Every plugin in [`PLUGIN_GROUP`] across all sources, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if a discovery source fails as a whole.
    pub fn discover(&self) -> PluginResult<Vec<PluginDescriptor>> {
        let mut descriptors = Vec::new();
        for source in &self.sources {
            for descriptor in source.discover()? {
                if descriptor.group == PLUGIN_GROUP {
                    descriptors.push(descriptor);
                } else {
                    debug!(plugin = %descriptor.name, group = %descriptor.group, "ignoring plugin from another group");
                }
            }
        }
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(descriptors)
    }

    /// Load all plugins into a fresh registry.
    ///
    /// # Errors
    ///
    /// See [`load_into`](Self::load_into).
    pub fn load(&self, settings: &RuntimeSettings) -> PluginResult<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        self.load_into(&mut registry, settings)?;
        Ok(registry)
    }

    /// Load all plugins into an existing registry, typically one already
    /// seeded with manifest pipelines.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], returns [`PluginError::LoadFailed`] for
    /// the first plugin whose hook fails; that plugin's partial registrations
    /// are rolled back first. Discovery errors are returned under either
    /// policy.
    pub fn load_into(
        &self,
        registry: &mut CommandRegistry,
        settings: &RuntimeSettings,
    ) -> PluginResult<LoadReport> {
        let context = PluginContext::new(settings.clone());
        let mut report = LoadReport {
            context: context.clone(),
            loaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for descriptor in self.discover()? {
            let Some(register) = &descriptor.register else {
                debug!(plugin = %descriptor.name, "plugin has no entry point, skipping");
                report.skipped.push(descriptor.name);
                continue;
            };

            let checkpoint = registry.checkpoint();
            match register(&mut *registry, &context) {
                Ok(()) => {
                    info!(plugin = %descriptor.name, origin = %descriptor.origin, "Loaded plugin");
                    report.loaded.push(descriptor.name);
                },
                Err(error) => {
                    let rolled_back = registry.rollback(checkpoint);
                    match self.policy {
                        FailurePolicy::Abort => {
                            return Err(PluginError::LoadFailed {
                                plugin: descriptor.name,
                                source: Box::new(error),
                            });
                        },
                        FailurePolicy::Isolate => {
                            warn!(
                                plugin = %descriptor.name,
                                error = %error,
                                rolled_back = rolled_back.len(),
                                "Plugin failed to load, skipping"
                            );
                            report.failed.push(PluginFailure {
                                plugin: descriptor.name,
                                error,
                                rolled_back,
                            });
                        },
                    }
                },
            }
        }

        Ok(report)
    }
}
