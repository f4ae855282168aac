//! `AgentControl` Telemetry - logging and structured events for the
//! orchestrator.
//!
//! This crate provides:
//! - `tracing` subscriber setup: compact, pretty or JSON, to a terminal or a log directory
//! - An append-only JSON-lines event recorder under the log directory
//!
//! # Example
//!
//! ```rust,no_run
//! use agentcontrol_telemetry::{EventRecorder, LogConfig, LogFormat, TelemetryEvent, setup_logging};
//!
//! # fn main() -> Result<(), agentcontrol_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("agentcontrol_commands=debug");
//! setup_logging(&config)?;
//!
//! let recorder = EventRecorder::for_log_dir("/home/dev/.agentcontrol/logs");
//! recorder.record(&TelemetryEvent::new("pipeline").with_status("success"))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod events;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use events::{EVENTS_FILE, EventRecorder, TELEMETRY_ENV, TelemetryEvent, telemetry_enabled};
pub use logging::{LOG_FILE_PREFIX, LogConfig, LogFormat, LogTarget, setup_logging};
