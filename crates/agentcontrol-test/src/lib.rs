//! AgentControl Test - Shared test utilities.
//!
//! Fixtures that stand up an isolated home directory and project capsule in
//! temp directories, plus mocks for the plugin-facing registrar.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! agentcontrol-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use agentcontrol_test::{ECHO_HELLO_MANIFEST, TestProject};
//!
//! let project = TestProject::with_manifest(ECHO_HELLO_MANIFEST);
//! let manifest = ManifestLoader::parse(&project.id().manifest_path())?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod env;
pub mod fixtures;
pub mod mocks;

pub use env::*;
pub use fixtures::*;
pub use mocks::*;
