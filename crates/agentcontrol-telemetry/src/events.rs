//! Append-only JSON-lines event log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::TelemetryResult;

/// Environment variable that disables event recording when set to
/// `0`, `false`, `no` or `off`.
pub const TELEMETRY_ENV: &str = "AGENTCONTROL_TELEMETRY";

/// File name of the event log inside the log directory.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Whether event recording is enabled for this process.
#[must_use]
pub fn telemetry_enabled() -> bool {
    enabled_from(std::env::var(TELEMETRY_ENV).ok().as_deref())
}

fn enabled_from(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    /// When the event was created.
    pub ts: DateTime<Utc>,
    /// Event name (`pipeline`, `sandbox.create`, ...).
    pub event: String,
    /// Severity label.
    pub level: String,
    /// Outcome label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Emitting component, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Wall time of the recorded operation.
    #[serde(rename = "durationMs", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Free-form details.
    pub payload: serde_json::Value,
}

impl TelemetryEvent {
    /// A new `info` event with an empty payload.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            event: event.into(),
            level: "info".to_owned(),
            status: None,
            component: None,
            duration_ms: None,
            payload: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the severity label.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the outcome label.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the emitting component.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Record how long the operation took.
    #[must_use]
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Appends [`TelemetryEvent`]s to `<log_dir>/events.jsonl`.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    path: Option<PathBuf>,
}

impl EventRecorder {
    /// A recorder writing under `log_dir`, honouring [`TELEMETRY_ENV`].
    #[must_use]
    pub fn for_log_dir(log_dir: impl AsRef<Path>) -> Self {
        if telemetry_enabled() {
            Self::enabled(log_dir)
        } else {
            Self::disabled()
        }
    }

    /// A recorder that always writes under `log_dir`.
    #[must_use]
    pub fn enabled(log_dir: impl AsRef<Path>) -> Self {
        Self {
            path: Some(log_dir.as_ref().join(EVENTS_FILE)),
        }
    }

    /// A recorder that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Whether events are written anywhere.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// The event log path, when enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory or file cannot be written.
    pub fn record(&self, event: &TelemetryEvent) -> TelemetryResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&line)?;
        debug!(event = %event.event, path = %path.display(), "recorded telemetry event");
        Ok(())
    }
}
