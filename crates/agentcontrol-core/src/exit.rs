//! Process exit codes.
//!
//! Every error kind surfaced by the orchestrator maps to one fixed, nonzero
//! code so that callers can distinguish failures without parsing messages.

/// The command or pipeline succeeded.
pub const SUCCESS: i32 = 0;

/// A pipeline step exited non-zero without `continue_on_failure`.
pub const STEP_FAILED: i32 = 1;

/// Invalid command-line usage.
pub const USAGE: i32 = 2;

/// The project has no `.agentcontrol/` capsule (or only a legacy layout).
pub const PROJECT_NOT_INITIALISED: i32 = 3;

/// The command manifest is structurally invalid.
pub const MANIFEST_SCHEMA: i32 = 4;

/// The requested command is not registered.
pub const COMMAND_NOT_FOUND: i32 = 5;

/// Two registrations claimed the same command name.
pub const COMMAND_COLLISION: i32 = 6;

/// A plugin's registration hook failed.
pub const PLUGIN_LOAD: i32 = 7;

/// A sandbox operation failed.
pub const SANDBOX: i32 = 8;

/// Unexpected internal or I/O failure (`EX_SOFTWARE`).
pub const INTERNAL: i32 = 70;

/// A pipeline step exceeded its deadline.
pub const STEP_TIMED_OUT: i32 = 124;

/// Execution was cancelled (SIGINT convention).
pub const CANCELLED: i32 = 130;
