//! `AgentControl` Commands - manifests, the command registry and pipeline
//! execution.
//!
//! This crate provides:
//! - [`ManifestLoader`]: parses `agentcall.yaml` into [`Pipeline`]s
//! - [`CommandRegistry`]: the single namespace of manifest pipelines and
//!   plugin commands, with loud collision detection
//! - [`CommandRegistrar`]: the registration surface plugins see
//! - [`PipelineExecutor`]: ordered, fail-fast step execution with deadlines
//!   and cancellation
//!
//! # Example
//!
//! ```rust,no_run
//! use agentcontrol_commands::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = ManifestLoader::parse(std::path::Path::new(".agentcontrol/agentcall.yaml"))?;
//! let registry = CommandRegistry::from_pipelines(manifest.into_pipelines())?;
//! let pipeline = registry.pipeline("verify")?;
//!
//! let env = ExecutionEnvironment::new(".");
//! let result = PipelineExecutor::new().run(pipeline, &env).await.into_result()?;
//! println!("{} steps ran", result.steps.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod executor;
pub mod manifest;
pub mod pipeline;
pub mod registry;

pub use error::{CommandError, CommandResult, ManifestError, ManifestResult};
pub use executor::{
    ExecutionEnvironment, ExecutionResult, PipelineExecutor, StepResult, StepStatus,
};
pub use manifest::{Manifest, ManifestLoader};
pub use pipeline::{Pipeline, Step};
pub use registry::{
    BuiltCommand, Checkpoint, CommandBuilder, CommandEntry, CommandHandler, CommandRegistrar,
    CommandRegistry, RegisteredCommand,
};
