//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentcontrol_sandbox::prelude::*;` to import all essential types.

// Errors
pub use crate::{SandboxError, SandboxResult};

// Descriptors
pub use crate::{MetadataValue, SandboxDescriptor, SandboxStatus};

// Management
pub use crate::{DEFAULT_KIND, SandboxManager};
