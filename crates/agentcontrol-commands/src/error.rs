//! Error types for manifests, the registry and pipeline execution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agentcontrol_core::exit;
use thiserror::Error;

/// Errors raised while loading a command manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest exceeds the size limit.
    #[error("manifest {} is {size} bytes, exceeding the {limit} byte limit", path.display())]
    TooLarge {
        /// Manifest path.
        path: PathBuf,
        /// Actual size.
        size: u64,
        /// Allowed size.
        limit: u64,
    },

    /// The manifest is not valid YAML.
    #[error("failed to parse manifest {}: {source}", path.display())]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The manifest is valid YAML but has the wrong shape.
    #[error("invalid manifest {}: {}{message}", path.display(), location(.command, .step))]
    Schema {
        /// Manifest path.
        path: PathBuf,
        /// Offending command, if the problem is inside one.
        command: Option<String>,
        /// Offending step index, if the problem is inside one.
        step: Option<usize>,
        /// What is wrong.
        message: String,
    },
}

#[allow(clippy::ref_option)]
fn location(command: &Option<String>, step: &Option<usize>) -> String {
    match (command, step) {
        (Some(c), Some(s)) => format!("command {c} step #{s}: "),
        (Some(c), None) => format!("command {c}: "),
        _ => String::new(),
    }
}

impl ManifestError {
    pub(crate) fn schema(path: &Path, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            command: None,
            step: None,
            message: message.into(),
        }
    }

    pub(crate) fn in_command(path: &Path, command: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            command: Some(command.to_owned()),
            step: None,
            message: message.into(),
        }
    }

    pub(crate) fn in_step(
        path: &Path,
        command: &str,
        step: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            command: Some(command.to_owned()),
            step: Some(step),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Read { .. } => exit::INTERNAL,
            Self::TooLarge { .. } | Self::Parse { .. } | Self::Schema { .. } => {
                exit::MANIFEST_SCHEMA
            },
        }
    }
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised by the registry and the pipeline executor.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No command is registered under the name.
    #[error("command {0} not registered")]
    NotFound(String),

    /// A command with the same name is already registered.
    #[error("command {0} is already registered")]
    Collision(String),

    /// The name refers to a plugin command, not a pipeline.
    #[error("command {0} is provided by a plugin, not a manifest pipeline")]
    NotAPipeline(String),

    /// A step exited unsuccessfully and the pipeline stopped.
    #[error(
        "command {command} failed at step #{index} ({step}): {}",
        describe_exit(.exit_code)
    )]
    StepFailed {
        /// Pipeline name.
        command: String,
        /// Zero-based index of the failing step.
        index: usize,
        /// Step label.
        step: String,
        /// Exit code, `None` if the process never ran or died by signal.
        exit_code: Option<i32>,
        /// Captured stdout of the failing step.
        stdout: String,
        /// Captured stderr of the failing step.
        stderr: String,
    },

    /// A step exceeded its deadline and its process group was killed.
    #[error("command {command} step #{index} ({step}) timed out after {timeout:?}")]
    TimedOut {
        /// Pipeline name.
        command: String,
        /// Zero-based index of the step.
        index: usize,
        /// Step label.
        step: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// Execution was cancelled during a step.
    #[error("command {command} cancelled during step #{index} ({step})")]
    Cancelled {
        /// Pipeline name.
        command: String,
        /// Zero-based index of the step.
        index: usize,
        /// Step label.
        step: String,
    },

    /// I/O error while preparing execution.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_owned(),
    }
}

impl CommandError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit::COMMAND_NOT_FOUND,
            Self::Collision(_) => exit::COMMAND_COLLISION,
            Self::NotAPipeline(_) => exit::USAGE,
            Self::StepFailed { .. } => exit::STEP_FAILED,
            Self::TimedOut { .. } => exit::STEP_TIMED_OUT,
            Self::Cancelled { .. } => exit::CANCELLED,
            Self::Io(_) => exit::INTERNAL,
        }
    }
}

/// Result type for registry and execution operations.
pub type CommandResult<T> = Result<T, CommandError>;
