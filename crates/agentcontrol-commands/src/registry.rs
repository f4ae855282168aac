//! Command registry.
//!
//! Holds every named command of one invocation: manifest pipelines first,
//! then plugin commands. Names are unique across both kinds and a second
//! registration under an existing name is rejected, never overridden.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use agentcontrol_core::PluginContext;
use tracing::{debug, info};

use crate::error::{CommandError, CommandResult};
use crate::pipeline::Pipeline;

/// Source label for manifest pipelines.
pub const MANIFEST_SOURCE: &str = "manifest";

/// Runs a plugin command against parsed arguments and yields an exit code.
pub type CommandHandler = Box<dyn Fn(&clap::ArgMatches) -> i32 + Send + Sync>;

/// Builds a plugin command's argument surface and handler.
pub type CommandBuilder = Arc<dyn Fn(clap::Command, &PluginContext) -> BuiltCommand + Send + Sync>;

/// Output of a [`CommandBuilder`].
pub struct BuiltCommand {
    /// The subcommand with the plugin's arguments attached.
    pub command: clap::Command,
    /// Handler invoked with the subcommand's matches.
    pub handler: CommandHandler,
}

impl BuiltCommand {
    /// Pair an argument surface with its handler.
    pub fn new<F>(command: clap::Command, handler: F) -> Self
    where
        F: Fn(&clap::ArgMatches) -> i32 + Send + Sync + 'static,
    {
        Self {
            command,
            handler: Box::new(handler),
        }
    }

    /// Run the handler.
    #[must_use]
    pub fn invoke(&self, matches: &clap::ArgMatches) -> i32 {
        (self.handler)(matches)
    }
}

impl fmt::Debug for BuiltCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltCommand")
            .field("command", &self.command.get_name())
            .finish_non_exhaustive()
    }
}

/// A command contributed by a plugin.
#[derive(Clone)]
pub struct RegisteredCommand {
    name: String,
    help: String,
    source: String,
    builder: CommandBuilder,
}

impl RegisteredCommand {
    /// A command called `name` with listing text `help`.
    pub fn new<F>(name: impl Into<String>, help: impl Into<String>, builder: F) -> Self
    where
        F: Fn(clap::Command, &PluginContext) -> BuiltCommand + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: help.into(),
            source: String::from("plugin"),
            builder: Arc::new(builder),
        }
    }

    /// Record which plugin contributed this command.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Listing text.
    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Contributing plugin.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Attach the plugin's arguments to `command` and produce its handler.
    ///
    /// `command` should already carry the name and help text; callers pass
    /// `clap::Command::new(name).about(help)`.
    #[must_use]
    pub fn build(&self, command: clap::Command, ctx: &PluginContext) -> BuiltCommand {
        (self.builder)(command, ctx)
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// One registry entry.
#[derive(Debug, Clone)]
pub enum CommandEntry {
    /// A pipeline from the project manifest.
    Pipeline(Pipeline),
    /// A command contributed by a plugin.
    Plugin(RegisteredCommand),
}

impl CommandEntry {
    /// Entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pipeline(p) => p.name(),
            Self::Plugin(c) => c.name(),
        }
    }

    /// Listing text.
    #[must_use]
    pub fn help(&self) -> String {
        match self {
            Self::Pipeline(p) => p.help(),
            Self::Plugin(c) => c.help().to_owned(),
        }
    }

    /// `"manifest"` for pipelines, the plugin name otherwise.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Pipeline(_) => MANIFEST_SOURCE,
            Self::Plugin(c) => c.source(),
        }
    }
}

/// The mutable surface plugins register against.
pub trait CommandRegistrar {
    /// Add a command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Collision`] if the name is taken.
    fn register(&mut self, command: RegisteredCommand) -> CommandResult<()>;

    /// Whether `name` is taken.
    fn contains(&self, name: &str) -> bool;
}

/// Registry length at a point in time; see [`CommandRegistry::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Named commands in registration order.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry from manifest pipelines, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Collision`] if two pipelines share a name.
    pub fn from_pipelines(pipelines: impl IntoIterator<Item = Pipeline>) -> CommandResult<Self> {
        let mut registry = Self::new();
        for pipeline in pipelines {
            registry.register_pipeline(pipeline)?;
        }
        Ok(registry)
    }

    /// Add a manifest pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Collision`] if the name is taken.
    pub fn register_pipeline(&mut self, pipeline: Pipeline) -> CommandResult<()> {
        self.insert(CommandEntry::Pipeline(pipeline))
    }

    fn insert(&mut self, entry: CommandEntry) -> CommandResult<()> {
        let name = entry.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(CommandError::Collision(name));
        }

        debug!(command = %name, source = entry.source(), "registered command");
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Look up a command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotFound`] if no command has that name.
    pub fn get(&self, name: &str) -> CommandResult<&CommandEntry> {
        self.index
            .get(name)
            .and_then(|&i| self.entries.get(i))
            .ok_or_else(|| CommandError::NotFound(name.to_owned()))
    }

    /// Look up a manifest pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotFound`] if absent, or
    /// [`CommandError::NotAPipeline`] if the name is a plugin command.
    pub fn pipeline(&self, name: &str) -> CommandResult<&Pipeline> {
        match self.get(name)? {
            CommandEntry::Pipeline(p) => Ok(p),
            CommandEntry::Plugin(_) => Err(CommandError::NotAPipeline(name.to_owned())),
        }
    }

    /// `(name, help)` pairs in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<(&str, String)> {
        self.entries.iter().map(|e| (e.name(), e.help())).collect()
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark the current state.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    /// Drop everything registered after `checkpoint`, returning the removed
    /// names in registration order.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> Vec<String> {
        if checkpoint.0 >= self.entries.len() {
            return Vec::new();
        }
        let removed: Vec<String> = self
            .entries
            .drain(checkpoint.0..)
            .map(|e| e.name().to_owned())
            .collect();
        for name in &removed {
            self.index.remove(name);
        }
        removed
    }
}

impl CommandRegistrar for CommandRegistry {
    fn register(&mut self, command: RegisteredCommand) -> CommandResult<()> {
        let source = command.source().to_owned();
        let name = command.name().to_owned();
        self.insert(CommandEntry::Plugin(command))?;
        info!(command = %name, plugin = %source, "registered plugin command");
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}
