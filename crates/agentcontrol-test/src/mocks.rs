//! Mock implementations of plugin-facing traits.

use agentcontrol_commands::{CommandError, CommandRegistrar, CommandResult, RegisteredCommand};

/// A [`CommandRegistrar`] that records registrations and optionally refuses
/// specific names.
#[derive(Debug, Default)]
pub struct RecordingRegistrar {
    registered: Vec<String>,
    refused: Vec<String>,
}

impl RecordingRegistrar {
    /// Accepts every unique name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a collision whenever `name` is registered.
    #[must_use]
    pub fn refusing(mut self, name: impl Into<String>) -> Self {
        self.refused.push(name.into());
        self
    }

    /// Names registered so far, in order.
    #[must_use]
    pub fn registered(&self) -> &[String] {
        &self.registered
    }
}

impl CommandRegistrar for RecordingRegistrar {
    fn register(&mut self, command: RegisteredCommand) -> CommandResult<()> {
        let name = command.name().to_owned();
        if self.refused.contains(&name) || self.registered.contains(&name) {
            return Err(CommandError::Collision(name));
        }
        self.registered.push(name);
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.registered.iter().any(|n| n == name)
    }
}
