//! Pipeline and step definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One external process invocation inside a [`Pipeline`].
///
/// The program is always present; a step cannot be built with an empty
/// argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    name: String,
    exec: Vec<String>,
    cwd: Option<PathBuf>,
    continue_on_failure: bool,
    timeout: Option<Duration>,
    env: BTreeMap<String, String>,
}

impl Step {
    /// A step labelled `name` that runs `program` with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exec: vec![program.into()],
            cwd: None,
            continue_on_failure: false,
            timeout: None,
            env: BTreeMap::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.exec.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `cwd` instead of the environment's working directory.
    /// Relative paths resolve against that working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Keep going when this step exits non-zero.
    #[must_use]
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Per-step deadline, overriding the environment default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extra environment variable for this step only.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Step label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full argument vector, program first.
    #[must_use]
    pub fn exec(&self) -> &[String] {
        &self.exec
    }

    /// The program to spawn.
    #[must_use]
    pub fn program(&self) -> &str {
        self.exec.first().map_or("", String::as_str)
    }

    /// Arguments after the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.exec.get(1..).unwrap_or_default()
    }

    /// Working directory override.
    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Whether a non-zero exit lets the pipeline continue.
    #[must_use]
    pub fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }

    /// Per-step deadline.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Per-step environment.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

/// A named, ordered, non-empty sequence of [`Step`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: String,
    description: Option<String>,
    steps: Vec<Step>,
}

impl Pipeline {
    /// A pipeline whose first step is `first`.
    #[must_use]
    pub fn new(name: impl Into<String>, first: Step) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: vec![first],
        }
    }

    /// Append a step.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the help text shown in listings.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Explicit description, if the manifest gave one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Help text: the description, or a generic line naming the pipeline.
    #[must_use]
    pub fn help(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Run the {} pipeline", self.name))
    }
}
