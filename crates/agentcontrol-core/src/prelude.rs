//! Prelude module - commonly used types for convenient import.
//!
//! Use `use agentcontrol_core::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentcontrol_core::prelude::*;
//!
//! let settings = RuntimeSettings::resolve()?;
//! let project = ProjectLocator::resolve(std::path::Path::new("."))?;
//! let ctx = PluginContext::new(settings);
//! ```

// Errors
pub use crate::{ProjectError, ProjectResult};

// Settings and context
pub use crate::{PluginContext, RuntimeSettings};

// Project resolution
pub use crate::{ProjectId, ProjectLocator};
