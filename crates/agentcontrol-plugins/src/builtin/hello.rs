//! The `hello` example plugin.

use agentcontrol_commands::{BuiltCommand, CommandRegistrar, RegisteredCommand};
use agentcontrol_core::{PluginContext, exit};

use crate::error::PluginResult;
use crate::plugin::Plugin;

/// Command registered by [`HelloPlugin`].
pub const HELLO_COMMAND: &str = "hello-plugin";

/// Greets the user; demonstrates the registration protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloPlugin;

fn greeting(name: &str, version: &str) -> String {
    format!("Hello, {name}! AgentControl version {version}")
}

impl Plugin for HelloPlugin {
    fn name(&self) -> &str {
        "hello"
    }

    fn register(
        &self,
        registrar: &mut dyn CommandRegistrar,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        let command = RegisteredCommand::new(
            HELLO_COMMAND,
            "Say hello from a plugin",
            |command, ctx: &PluginContext| {
                let command = command.arg(
                    clap::Arg::new("name")
                        .long("name")
                        .default_value("Agent")
                        .help("Name to greet"),
                );
                let version = ctx.version().to_owned();
                BuiltCommand::new(command, move |matches| {
                    let name = matches
                        .get_one::<String>("name")
                        .map_or("Agent", String::as_str);
                    println!("{}", greeting(name, &version));
                    exit::SUCCESS
                })
            },
        )
        .with_source(self.name());

        registrar.register(command)?;
        Ok(())
    }
}
