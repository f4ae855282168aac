//! Command manifest (`agentcall.yaml`) parsing.
//!
//! ```yaml
//! commands:
//!   verify:
//!     description: Run all checks
//!     steps:
//!       - name: lint
//!         exec: ["cargo", "clippy"]
//!         continue_on_failure: true
//!       - exec: ["cargo", "test"]
//!         timeout_secs: 600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_yaml::Value;
use tracing::debug;

use crate::error::{ManifestError, ManifestResult};
use crate::pipeline::{Pipeline, Step};

/// Maximum accepted manifest size (1 MiB).
pub const MAX_MANIFEST_SIZE: u64 = 1_048_576;

/// Pipelines parsed from one manifest, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pipelines: Vec<Pipeline>,
}

impl Manifest {
    /// Pipelines in document order.
    #[must_use]
    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    /// Pipeline names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.iter().map(Pipeline::name)
    }

    /// Look up a pipeline by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    /// Number of pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether the manifest declares no pipelines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Take ownership of the pipelines.
    #[must_use]
    pub fn into_pipelines(self) -> Vec<Pipeline> {
        self.pipelines
    }
}

/// Parses manifests into [`Manifest`]s. Never spawns anything.
pub struct ManifestLoader;

impl ManifestLoader {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file cannot be read, is too large, is
    /// not YAML, or does not have the expected shape.
    pub fn parse(path: &Path) -> ManifestResult<Manifest> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let size = content.len() as u64;
        if size > MAX_MANIFEST_SIZE {
            return Err(ManifestError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: MAX_MANIFEST_SIZE,
            });
        }

        Self::parse_str(path, &content)
    }

    /// Parse manifest text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if `content` is not YAML or does not have the
    /// expected shape.
    pub fn parse_str(path: &Path, content: &str) -> ManifestResult<Manifest> {
        let doc: Value = serde_yaml::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        let commands = match &doc {
            Value::Mapping(root) => match root.get("commands") {
                Some(Value::Mapping(commands)) => commands,
                Some(_) => {
                    return Err(ManifestError::schema(path, "`commands` is not a mapping"));
                },
                None => return Err(ManifestError::schema(path, "missing `commands` mapping")),
            },
            Value::Null => return Err(ManifestError::schema(path, "missing `commands` mapping")),
            _ => return Err(ManifestError::schema(path, "document is not a mapping")),
        };

        let mut pipelines = Vec::with_capacity(commands.len());
        for (key, payload) in commands {
            let Value::String(name) = key else {
                return Err(ManifestError::schema(
                    path,
                    format!("command name {key:?} is not a string"),
                ));
            };
            pipelines.push(parse_command(path, name, payload)?);
        }

        debug!(path = %path.display(), count = pipelines.len(), "parsed manifest");
        Ok(Manifest { pipelines })
    }
}

fn parse_command(path: &Path, name: &str, payload: &Value) -> ManifestResult<Pipeline> {
    let Value::Mapping(body) = payload else {
        return Err(ManifestError::in_command(path, name, "must be a mapping"));
    };

    let raw_steps = match body.get("steps") {
        Some(Value::Sequence(steps)) if !steps.is_empty() => steps,
        Some(Value::Sequence(_)) | None | Some(Value::Null) => {
            return Err(ManifestError::in_command(path, name, "has no steps"));
        },
        Some(_) => return Err(ManifestError::in_command(path, name, "`steps` is not a list")),
    };

    let mut steps = raw_steps
        .iter()
        .enumerate()
        .map(|(idx, raw)| parse_step(path, name, idx, raw));

    let Some(first) = steps.next().transpose()? else {
        return Err(ManifestError::in_command(path, name, "has no steps"));
    };
    let mut pipeline = Pipeline::new(name, first);
    for step in steps {
        pipeline = pipeline.with_step(step?);
    }

    match body.get("description") {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            pipeline = pipeline.with_description(text.trim());
        },
        Some(Value::String(_) | Value::Null) | None => {},
        Some(_) => {
            return Err(ManifestError::in_command(
                path,
                name,
                "`description` is not a string",
            ));
        },
    }

    Ok(pipeline)
}

fn parse_step(path: &Path, command: &str, idx: usize, raw: &Value) -> ManifestResult<Step> {
    let err = |message: &str| ManifestError::in_step(path, command, idx, message);

    let Value::Mapping(body) = raw else {
        return Err(err("must be a mapping"));
    };

    let exec = match body.get("exec") {
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(err("exec must be a list of strings")),
            })
            .collect::<ManifestResult<Vec<_>>>()?,
        Some(_) => return Err(err("exec must be a list of strings")),
        None => return Err(err("missing exec")),
    };
    let mut exec = exec.into_iter();
    let Some(program) = exec.next().filter(|p| !p.is_empty()) else {
        return Err(err("exec must name a program"));
    };

    let name = match body.get("name") {
        Some(Value::String(n)) if !n.is_empty() => n.clone(),
        Some(Value::String(_) | Value::Null) | None => format!("{command}-step{idx}"),
        Some(_) => return Err(err("name is not a string")),
    };

    let mut step = Step::new(name, program).args(exec);

    match body.get("cwd") {
        Some(Value::String(cwd)) => step = step.with_cwd(PathBuf::from(cwd)),
        Some(Value::Null) | None => {},
        Some(_) => return Err(err("cwd is not a string")),
    }

    match body.get("continue_on_failure") {
        Some(Value::Bool(flag)) => step = step.with_continue_on_failure(*flag),
        Some(Value::Null) | None => {},
        Some(_) => return Err(err("continue_on_failure is not a boolean")),
    }

    match body.get("timeout_secs") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => {},
            Some(secs) => step = step.with_timeout(Duration::from_secs(secs)),
            None => return Err(err("timeout_secs must be a non-negative integer")),
        },
        Some(Value::Null) | None => {},
        Some(_) => return Err(err("timeout_secs must be a non-negative integer")),
    }

    match body.get("env") {
        Some(Value::Mapping(env)) => {
            for (key, value) in env {
                let (Value::String(key), Some(value)) = (key, scalar_to_string(value)) else {
                    return Err(err("env must map strings to scalars"));
                };
                step = step.with_env(key.clone(), value);
            }
        },
        Some(Value::Null) | None => {},
        Some(_) => return Err(err("env is not a mapping")),
    }

    Ok(step)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ManifestResult<Manifest> {
        ManifestLoader::parse_str(Path::new("agentcall.yaml"), yaml)
    }

    #[test]
    fn test_parse_preserves_document_order() {
        let manifest = parse(
            r#"
commands:
  zeta:
    steps:
      - exec: ["echo", "z"]
  alpha:
    steps:
      - exec: ["echo", "a"]
  mid:
    steps:
      - exec: ["echo", "m"]
"#,
        )
        .unwrap();

        let names: Vec<_> = manifest.names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_full_step() {
        let manifest = parse(
            r#"
commands:
  verify:
    description: Run all checks
    extra_field: ignored
    steps:
      - name: lint
        exec: ["cargo", "clippy", "--all"]
        cwd: crates
        continue_on_failure: true
        timeout_secs: 30
        env:
          RUST_LOG: debug
          RETRIES: 3
      - exec: ["cargo", "test"]
"#,
        )
        .unwrap();

        let verify = manifest.get("verify").unwrap();
        assert_eq!(verify.help(), "Run all checks");
        assert_eq!(verify.steps().len(), 2);

        let lint = &verify.steps()[0];
        assert_eq!(lint.name(), "lint");
        assert_eq!(lint.program(), "cargo");
        assert_eq!(lint.arguments(), ["clippy", "--all"]);
        assert_eq!(lint.cwd(), Some(Path::new("crates")));
        assert!(lint.continue_on_failure());
        assert_eq!(lint.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(lint.env().get("RETRIES").map(String::as_str), Some("3"));

        let test = &verify.steps()[1];
        assert_eq!(test.name(), "verify-step1");
        assert!(!test.continue_on_failure());
        assert_eq!(test.timeout(), None);
    }

    #[test]
    fn test_empty_commands_mapping_is_valid() {
        let manifest = parse("commands: {}\n").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_empty_document_is_schema_error() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ManifestError::Schema { .. }));
        assert!(err.to_string().contains("missing `commands`"));
    }

    #[test]
    fn test_commands_not_mapping() {
        let err = parse("commands: [a, b]\n").unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_command_without_steps() {
        for yaml in [
            "commands:\n  build: {}\n",
            "commands:\n  build:\n    steps: []\n",
        ] {
            let err = parse(yaml).unwrap_err();
            match err {
                ManifestError::Schema { command, step, .. } => {
                    assert_eq!(command.as_deref(), Some("build"));
                    assert_eq!(step, None);
                },
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_step_without_exec() {
        let err = parse("commands:\n  build:\n    steps:\n      - name: x\n").unwrap_err();
        match err {
            ManifestError::Schema {
                command, step, message, ..
            } => {
                assert_eq!(command.as_deref(), Some("build"));
                assert_eq!(step, Some(0));
                assert_eq!(message, "missing exec");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_exec_must_be_list_of_strings() {
        for exec in ["\"echo hi\"", "[\"echo\", 1]", "[[\"echo\"]]"] {
            let yaml = format!("commands:\n  c:\n    steps:\n      - exec: {exec}\n");
            let err = parse(&yaml).unwrap_err();
            assert!(
                err.to_string().contains("exec must be a list of strings"),
                "{exec}: {err}"
            );
        }
    }

    #[test]
    fn test_exec_must_not_be_empty() {
        let err = parse("commands:\n  c:\n    steps:\n      - exec: []\n").unwrap_err();
        assert!(err.to_string().contains("exec must name a program"));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = parse("commands: [unclosed\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn test_parse_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentcall.yaml");
        std::fs::write(&path, "commands:\n  hello:\n    steps:\n      - exec: [echo, hello]\n")
            .unwrap();

        let manifest = ManifestLoader::parse(&path).unwrap();
        let hello = manifest.get("hello").unwrap();
        assert_eq!(hello.steps()[0].exec(), ["echo", "hello"]);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestLoader::parse(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
