//! Test fixtures for manifests and commands.

use agentcontrol_commands::{BuiltCommand, Pipeline, RegisteredCommand, Step};
use tracing_subscriber::EnvFilter;

/// A manifest with a single `hello` command that echoes.
pub const ECHO_HELLO_MANIFEST: &str = "\
commands:
  hello:
    steps:
      - name: say
        exec: [\"echo\", \"hello\"]
";

/// A two-step pipeline whose second step fails after the first leaves a
/// marker file in the working directory.
pub const ABORTING_MANIFEST: &str = "\
commands:
  broken:
    steps:
      - name: touch
        exec: [\"touch\", \"step1.marker\"]
      - name: fail
        exec: [\"false\"]
      - name: never
        exec: [\"touch\", \"step3.marker\"]
";

/// A one-step pipeline running `echo <name>`.
#[must_use]
pub fn test_pipeline(name: &str) -> Pipeline {
    Pipeline::new(name, Step::new(format!("{name}-step0"), "echo").arg(name))
}

/// A plugin command whose handler always returns `code`.
#[must_use]
pub fn test_command(name: &str, code: i32) -> RegisteredCommand {
    RegisteredCommand::new(name, format!("{name} help"), move |command, _ctx| {
        BuiltCommand::new(command, move |_matches| code)
    })
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
///
/// Honours `RUST_LOG`, defaulting to `debug` for AgentControl crates.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agentcontrol=debug,warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
