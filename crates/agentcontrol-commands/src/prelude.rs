//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentcontrol_commands::prelude::*;` to import all essential types.

// Errors
pub use crate::{CommandError, CommandResult, ManifestError, ManifestResult};

// Manifests and pipelines
pub use crate::{Manifest, ManifestLoader, Pipeline, Step};

// Registry
pub use crate::{BuiltCommand, CommandEntry, CommandRegistrar, CommandRegistry, RegisteredCommand};

// Execution
pub use crate::{ExecutionEnvironment, ExecutionResult, PipelineExecutor, StepResult, StepStatus};
