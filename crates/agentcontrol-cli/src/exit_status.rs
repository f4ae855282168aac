//! Mapping errors to process exit codes.

use std::process::ExitCode;

use agentcontrol_commands::{CommandError, ManifestError};
use agentcontrol_config::ConfigError;
use agentcontrol_core::{ProjectError, exit};
use agentcontrol_plugins::PluginError;
use agentcontrol_sandbox::SandboxError;

/// Exit code for an error, from the first cause with a known kind.
pub(crate) fn code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<ProjectError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ManifestError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<CommandError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<PluginError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<SandboxError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit::USAGE;
        }
    }
    exit::INTERNAL
}

pub(crate) fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
