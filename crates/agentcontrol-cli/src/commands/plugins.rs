//! Plugin commands - list and inspect discovered plugins.

use agentcontrol_commands::CommandRegistry;
use agentcontrol_core::{PluginContext, exit};
use agentcontrol_plugins::PluginDescriptor;
use serde_json::json;

use crate::app::App;
use crate::theme::Theme;

pub(crate) fn list_plugins(app: &App, json: bool) -> anyhow::Result<i32> {
    let plugins = app.recorded("plugins.list", "plugins", json!({}), || {
        Ok(app.plugin_loader().discover()?)
    })?;

    if json {
        let entries: Vec<_> = plugins.iter().map(describe).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "plugins": entries }))?
        );
        return Ok(exit::SUCCESS);
    }

    if plugins.is_empty() {
        println!("{}", Theme::info("No plugins registered"));
        return Ok(exit::SUCCESS);
    }

    println!("{}", Theme::header("Plugins"));
    println!("  {:<20} {:<10} ORIGIN", "NAME", "VERSION");
    println!("{}", Theme::separator());
    for plugin in &plugins {
        let origin = if plugin.is_loadable() {
            Theme::dimmed(&plugin.origin)
        } else {
            Theme::warning(&format!("{} (no entry point)", plugin.origin))
        };
        println!(
            "  {:<20} {:<10} {}",
            plugin.name,
            plugin.version.as_deref().unwrap_or("-"),
            origin
        );
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} plugin(s)", plugins.len()))
    );
    Ok(exit::SUCCESS)
}

/// Show one plugin and the commands it registers.
pub(crate) fn plugin_info(app: &App, name: &str) -> anyhow::Result<i32> {
    let plugins = app.recorded(
        "plugins.info",
        "plugins",
        json!({ "name": name }),
        || Ok(app.plugin_loader().discover()?),
    )?;
    let Some(plugin) = plugins.iter().find(|p| p.name == name) else {
        eprintln!("{}", Theme::error(&format!("Plugin {name} not found")));
        return Ok(exit::COMMAND_NOT_FOUND);
    };

    println!("{}", Theme::header(&format!("Plugin: {}", plugin.name)));
    println!("{}", Theme::kv("Group", &plugin.group));
    println!("{}", Theme::kv("Origin", &plugin.origin));
    if let Some(version) = &plugin.version {
        println!("{}", Theme::kv("Version", version));
    }
    if let Some(summary) = &plugin.summary {
        println!("{}", Theme::kv("Summary", summary));
    }

    let Some(register) = &plugin.register else {
        println!("{}", Theme::warning("No entry point; nothing to load"));
        return Ok(exit::SUCCESS);
    };

    // Dry-run registration into a scratch registry.
    let ctx = PluginContext::new(app.settings().clone());
    let mut scratch = CommandRegistry::new();
    match register(&mut scratch, &ctx) {
        Ok(()) => {
            println!("{}", Theme::kv("Commands", ""));
            for (command, help) in scratch.list() {
                println!("  {command:<20} {}", Theme::dimmed(&help));
            }
        },
        Err(e) => println!("{}", Theme::error(&format!("Registration fails: {e}"))),
    }
    Ok(exit::SUCCESS)
}

fn describe(plugin: &PluginDescriptor) -> serde_json::Value {
    json!({
        "name": plugin.name,
        "group": plugin.group,
        "origin": plugin.origin,
        "version": plugin.version,
        "summary": plugin.summary,
        "loadable": plugin.is_loadable(),
    })
}
