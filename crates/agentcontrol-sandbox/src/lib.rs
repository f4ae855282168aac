//! AgentControl Sandbox - Ephemeral workspaces inside a project capsule.
//!
//! Each sandbox is a directory under `<capsule>/sandbox/<id>/` described by
//! an entry in `<capsule>/state/sandbox/index.json`:
//!
//! ```text
//! .agentcontrol/
//! ├── sandbox/
//! │   ├── 20260101-120000-a1b2c3/
//! │   └── 20260101-120005-d4e5f6/
//! └── state/
//!     └── sandbox/
//!         ├── index.json
//!         └── index.lock
//! ```
//!
//! Every mutation holds an exclusive advisory lock on `index.lock`, so
//! concurrent `agentcall` processes never lose each other's entries.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod descriptor;
mod error;
mod index;
mod manager;

pub use descriptor::{MetadataValue, SandboxDescriptor, SandboxStatus};
pub use error::{SandboxError, SandboxResult};
pub use manager::{DEFAULT_KIND, SandboxManager};
