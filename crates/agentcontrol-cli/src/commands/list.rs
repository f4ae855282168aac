//! List command - show every registered command.

use agentcontrol_core::exit;
use serde_json::json;

use crate::app::App;
use crate::theme::Theme;

/// Print the registry: manifest pipelines first, then plugin commands.
pub(crate) fn list_commands(app: &App, json: bool) -> anyhow::Result<i32> {
    let project = app.project()?;
    let (registry, _report) = app.load_registry(project)?;

    if json {
        let entries: Vec<_> = registry
            .entries()
            .map(|e| json!({ "name": e.name(), "source": e.source(), "help": e.help() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "commands": entries }))?);
        return Ok(exit::SUCCESS);
    }

    if registry.is_empty() {
        println!("{}", Theme::info("No commands registered"));
        return Ok(exit::SUCCESS);
    }

    println!("{}", Theme::header("Commands"));
    println!("  {:<24} {:<16} HELP", "NAME", "SOURCE");
    println!("{}", Theme::separator());
    for entry in registry.entries() {
        println!(
            "  {:<24} {:<16} {}",
            entry.name(),
            entry.source(),
            entry.help()
        );
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} command(s)", registry.len()))
    );
    Ok(exit::SUCCESS)
}
