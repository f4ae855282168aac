//! AgentControl CLI - `agentcall`, the project command orchestrator.
//!
//! Resolves the project capsule, loads its command manifest and the
//! installed plugins into one registry, and runs the requested command.
//! Every failure maps to a fixed exit code (see `agentcontrol_core::exit`).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use agentcontrol_core::exit;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod commands;
mod config_bridge;
mod exit_status;
mod theme;

use app::App;
use commands::run::SandboxChoice;
use commands::{init, list, plugins, run, sandbox};
use theme::Theme;

/// AgentControl - project command orchestrator
#[derive(Parser)]
#[command(name = "agentcall")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "Commands from the project manifest and plugins can also be run directly:\n  agentcall <name> [args...]"
)]
struct Cli {
    /// Project directory (defaults to the nearest project above the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise a project capsule with a starter manifest
    Init,

    /// List registered commands
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a pipeline or plugin command
    Run {
        /// Attach an existing sandbox to the run
        #[arg(long, value_name = "ID")]
        sandbox: Option<String>,

        /// Allocate a fresh sandbox for the run
        #[arg(long, conflicts_with = "sandbox")]
        new_sandbox: bool,

        /// Command name
        name: String,

        /// Arguments passed to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Manage sandbox workspaces
    Sandbox {
        #[command(subcommand)]
        command: SandboxCommands,
    },

    /// Inspect installed plugins
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },

    /// A registered command invoked by name
    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Subcommand)]
enum SandboxCommands {
    /// Create a sandbox
    Create {
        /// Template kind (defaults to `sandbox.default_kind`)
        #[arg(long)]
        kind: Option<String>,

        /// Metadata entry, repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// List sandboxes
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one sandbox
    Remove {
        /// Sandbox id
        id: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every sandbox
    Purge {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List discovered plugins
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Show details for one plugin
    Info {
        /// Plugin name
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                exit::USAGE
            } else {
                exit::SUCCESS
            };
            return exit_status::to_exit_code(code);
        },
    };

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            exit_status::code_for(&e)
        },
    };
    exit_status::to_exit_code(code)
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let app = App::bootstrap(cli.path, cli.verbose)?;

    match cli.command {
        Commands::Init => init::run_init(&app),
        Commands::List { json } => list::list_commands(&app, json),
        Commands::Run {
            sandbox,
            new_sandbox,
            name,
            args,
        } => {
            let choice = SandboxChoice::from_flags(sandbox, new_sandbox);
            run::run_command(&app, &name, args, choice).await
        },
        Commands::Sandbox { command } => handle_sandbox(&app, command),
        Commands::Plugins { command } => handle_plugins(&app, command),
        Commands::External(argv) => {
            let Some((name, args)) = argv.split_first() else {
                anyhow::bail!("missing command name");
            };
            run::run_command(&app, name, args.to_vec(), SandboxChoice::None).await
        },
    }
}

fn handle_sandbox(app: &App, command: SandboxCommands) -> Result<i32> {
    match command {
        SandboxCommands::Create { kind, meta, json } => {
            sandbox::create_sandbox(app, kind.as_deref(), &meta, json)
        },
        SandboxCommands::List { json } => sandbox::list_sandboxes(app, json),
        SandboxCommands::Remove { id, json } => sandbox::remove_sandbox(app, &id, json),
        SandboxCommands::Purge { json } => sandbox::purge_sandboxes(app, json),
    }
}

fn handle_plugins(app: &App, command: PluginCommands) -> Result<i32> {
    match command {
        PluginCommands::List { json } => plugins::list_plugins(app, json),
        PluginCommands::Info { name } => plugins::plugin_info(app, &name),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_registered_command_is_external() {
        let cli = Cli::try_parse_from(["agentcall", "verify", "--fast", "x"]).unwrap();
        let Commands::External(argv) = cli.command else {
            panic!("expected external subcommand");
        };
        assert_eq!(argv, ["verify", "--fast", "x"]);
    }

    #[test]
    fn test_run_collects_trailing_args() {
        let cli =
            Cli::try_parse_from(["agentcall", "--path", "/p", "run", "build", "--release"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("/p")));
        let Commands::Run { name, args, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(name, "build");
        assert_eq!(args, ["--release"]);
    }

    #[test]
    fn test_sandbox_flags_conflict() {
        assert!(
            Cli::try_parse_from(["agentcall", "run", "--sandbox", "x", "--new-sandbox", "b"])
                .is_err()
        );
    }

    #[test]
    fn test_sandbox_create_meta_is_repeatable() {
        let cli = Cli::try_parse_from([
            "agentcall", "sandbox", "create", "--meta", "a=1", "--meta", "b=two",
        ])
        .unwrap();
        let Commands::Sandbox {
            command: SandboxCommands::Create { meta, kind, .. },
        } = cli.command
        else {
            panic!("expected sandbox create");
        };
        assert_eq!(meta, ["a=1", "b=two"]);
        assert!(kind.is_none());
    }
}
