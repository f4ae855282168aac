//! Sandbox errors.

use std::path::PathBuf;

use agentcontrol_core::exit;
use thiserror::Error;

/// Errors raised by sandbox management.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The kind label is empty or contains characters unsafe for a path.
    #[error("invalid sandbox kind {0:?}: use letters, digits, '-' or '_'")]
    InvalidKind(String),

    /// No sandbox has the requested id.
    #[error("no sandbox with id {0}")]
    NotFound(String),

    /// A metadata entry could not be parsed.
    #[error("invalid metadata entry {0:?}: expected key=value")]
    InvalidMetadata(String),

    /// The index file exists but is not valid JSON.
    #[error("sandbox index {path} is corrupt: {source}")]
    IndexCorrupt {
        /// Index file.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The index lock could not be acquired.
    #[error("failed to lock sandbox index {path}: {source}")]
    Lock {
        /// Lock file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Populating a new sandbox failed. The directory has been removed.
    #[error("failed to materialise sandbox {id}: {source}")]
    Materialise {
        /// Id of the sandbox that was being created.
        id: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// The process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidKind(_) | Self::InvalidMetadata(_) => exit::USAGE,
            Self::Serde(_) | Self::Io(_) => exit::INTERNAL,
            Self::NotFound(_)
            | Self::IndexCorrupt { .. }
            | Self::Lock { .. }
            | Self::Materialise { .. } => exit::SANDBOX,
        }
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
