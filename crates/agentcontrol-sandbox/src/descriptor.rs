//! Sandbox descriptors as stored in the index.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SandboxError, SandboxResult};

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// `true` / `false`.
    Bool(bool),
    /// Whole number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Anything else.
    Str(String),
}

impl MetadataValue {
    /// Parse a raw command-line value, preferring the narrowest scalar type.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {},
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Self::Int(int);
        }
        match raw.parse::<f64>() {
            Ok(float) if float.is_finite() && raw.contains('.') => Self::Float(float),
            _ => Self::Str(raw.to_owned()),
        }
    }

    /// Parse a `key=value` entry. Key and value are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InvalidMetadata`] when there is no `=` or the
    /// key is empty.
    pub fn parse_entry(entry: &str) -> SandboxResult<(String, Self)> {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(SandboxError::InvalidMetadata(entry.to_owned()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(SandboxError::InvalidMetadata(entry.to_owned()));
        }
        Ok((key.to_owned(), Self::parse(value.trim())))
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Lifecycle state recorded for a sandbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    /// Materialised and usable.
    #[default]
    Ready,
    /// A status written by a newer or older tool.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// One provisioned sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxDescriptor {
    /// Unique id, also the directory name.
    pub sandbox_id: String,
    /// Absolute path of the workspace directory.
    pub path: PathBuf,
    /// Kind label the sandbox was created from.
    #[serde(rename = "template")]
    pub kind: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Lifecycle state.
    #[serde(default)]
    pub status: SandboxStatus,
    /// Free-form scalar metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(MetadataValue::parse("true"), MetadataValue::Bool(true));
        assert_eq!(MetadataValue::parse("42"), MetadataValue::Int(42));
        assert_eq!(MetadataValue::parse("-3"), MetadataValue::Int(-3));
        assert_eq!(MetadataValue::parse("0.5"), MetadataValue::Float(0.5));
        assert_eq!(
            MetadataValue::parse("review"),
            MetadataValue::Str("review".into())
        );
        assert_eq!(MetadataValue::parse("inf"), MetadataValue::Str("inf".into()));
    }

    #[test]
    fn test_parse_entry_trims_and_splits_once() {
        let (key, value) = MetadataValue::parse_entry(" purpose = a=b ").unwrap();
        assert_eq!(key, "purpose");
        assert_eq!(value, MetadataValue::Str("a=b".into()));
    }

    #[test]
    fn test_parse_entry_rejects_missing_separator() {
        assert!(matches!(
            MetadataValue::parse_entry("purpose"),
            Err(SandboxError::InvalidMetadata(_))
        ));
        assert!(MetadataValue::parse_entry("=x").is_err());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = SandboxDescriptor {
            sandbox_id: "20260101-000000-abcdef".into(),
            path: PathBuf::from("/p/.agentcontrol/sandbox/20260101-000000-abcdef"),
            kind: "sandbox".into(),
            created_at: Utc::now(),
            status: SandboxStatus::Ready,
            metadata: BTreeMap::from([("n".to_owned(), MetadataValue::Int(1))]),
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["template"], "sandbox");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["metadata"]["n"], 1);
    }

    #[test]
    fn test_unknown_status_and_missing_fields_tolerated() {
        let json = r#"{
            "sandbox_id": "x",
            "path": "/tmp/x",
            "template": "sandbox",
            "created_at": "2026-01-01T00:00:00Z",
            "status": "archived"
        }"#;
        let descriptor: SandboxDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.status, SandboxStatus::Unknown);
        assert!(descriptor.metadata.is_empty());
    }
}
