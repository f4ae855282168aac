//! Project resolution errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit;

/// Errors raised while locating or initialising a project capsule.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// No capsule, or a capsule without a command manifest.
    #[error("{root} is not an AgentControl project (missing .agentcontrol/agentcall.yaml)")]
    NotInitialised {
        /// The project root that was checked.
        root: PathBuf,
    },

    /// A manifest exists only at a pre-capsule location.
    #[error(
        "{root} uses the legacy layout ({legacy_manifest}); move it into .agentcontrol/ to continue"
    )]
    LegacyLayout {
        /// The project root that was checked.
        root: PathBuf,
        /// The manifest found outside the capsule.
        legacy_manifest: PathBuf,
    },

    /// `init` was asked to create a capsule that already has a manifest.
    #[error("project already initialised at {0}")]
    AlreadyInitialised(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProjectError {
    /// Whether this error means "there is no usable capsule here".
    ///
    /// True for both the plain and the legacy-layout case.
    #[must_use]
    pub fn is_not_initialised(&self) -> bool {
        matches!(self, Self::NotInitialised { .. } | Self::LegacyLayout { .. })
    }

    /// The process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotInitialised { .. } | Self::LegacyLayout { .. } => {
                exit::PROJECT_NOT_INITIALISED
            },
            Self::AlreadyInitialised(_) => exit::USAGE,
            Self::Io(_) => exit::INTERNAL,
        }
    }
}

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;
