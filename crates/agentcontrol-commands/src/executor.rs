//! Pipeline executor.
//!
//! Runs a pipeline's steps strictly in order, one child process at a time.
//! Each child runs in its own process group so that a timeout or cancellation
//! can kill everything the step started.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use agentcontrol_core::{ProjectId, RuntimeSettings};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CommandError, CommandResult};
use crate::pipeline::{Pipeline, Step};

/// Home directory exported to steps.
pub const HOME_VAR: &str = "AGENTCONTROL_HOME";
/// Project root exported to steps.
pub const PROJECT_ROOT_VAR: &str = "AGENTCONTROL_PROJECT_ROOT";
/// Per-project state directory exported to steps.
pub const STATE_VAR: &str = "AGENTCONTROL_STATE";
/// CLI version exported to steps.
pub const VERSION_VAR: &str = "AGENTCONTROL_VERSION";
/// Attached sandbox directory exported to steps.
pub const SANDBOX_VAR: &str = "AGENTCONTROL_SANDBOX";

/// How long to wait for captured output once a step has been killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Everything a run needs besides the pipeline itself.
#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    extra_args: Vec<String>,
    default_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ExecutionEnvironment {
    /// Run steps in `working_dir` with the inherited environment.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            extra_args: Vec::new(),
            default_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Environment for running `project`'s pipelines.
    ///
    /// Creates the per-project state directory and exports the
    /// `AGENTCONTROL_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created.
    pub fn for_project(settings: &RuntimeSettings, project: &ProjectId) -> io::Result<Self> {
        let state_dir = settings.project_state_dir(project.root());
        std::fs::create_dir_all(&state_dir)?;

        Ok(Self::new(project.root())
            .with_env(HOME_VAR, settings.home_dir.display().to_string())
            .with_env(PROJECT_ROOT_VAR, project.root().display().to_string())
            .with_env(STATE_VAR, state_dir.display().to_string())
            .with_env(VERSION_VAR, settings.version.clone()))
    }

    /// Export one variable to every step.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Export several variables to every step.
    #[must_use]
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Expose a sandbox directory to every step.
    #[must_use]
    pub fn with_sandbox(self, path: &Path) -> Self {
        self.with_env(SANDBOX_VAR, path.display().to_string())
    }

    /// Arguments appended to the first step only.
    #[must_use]
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args = args.into_iter().collect();
        self
    }

    /// Deadline for steps without their own `timeout_secs`.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels the run when triggered.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Base working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Variables exported to every step.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Exited with status zero.
    Success,
    /// Exited non-zero, died by signal, or could not be spawned.
    Failed {
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
    },
    /// Exceeded its deadline and was killed.
    TimedOut(Duration),
    /// The run was cancelled while this step was pending or running.
    Cancelled,
}

impl StepStatus {
    /// Whether the step exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed { .. } => "failed",
            Self::TimedOut(_) => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of one step. Output belongs to this step only.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Zero-based position in the pipeline.
    pub index: usize,
    /// Step label.
    pub name: String,
    /// Argument vector actually spawned, extra args included.
    pub argv: Vec<String>,
    /// How the step ended.
    pub status: StepStatus,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr, or the spawn error.
    pub stderr: String,
    /// Wall time.
    pub duration: Duration,
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Pipeline name.
    pub command: String,
    /// Results of the steps that ran, in order.
    pub steps: Vec<StepResult>,
    /// Index into `steps` of the step that stopped the run.
    pub failed_at: Option<usize>,
}

impl ExecutionResult {
    /// Whether the run completed without a stopping failure.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed_at.is_none()
    }

    /// The step that stopped the run.
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.failed_at.and_then(|i| self.steps.get(i))
    }

    /// Convert a failed run into the matching [`CommandError`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::StepFailed`], [`CommandError::TimedOut`] or
    /// [`CommandError::Cancelled`] when a step stopped the run.
    pub fn into_result(mut self) -> CommandResult<Self> {
        let Some(failed_at) = self.failed_at else {
            return Ok(self);
        };
        if failed_at >= self.steps.len() {
            return Ok(self);
        }
        let step = self.steps.swap_remove(failed_at);
        Err(match step.status {
            StepStatus::TimedOut(timeout) => CommandError::TimedOut {
                command: self.command,
                index: step.index,
                step: step.name,
                timeout,
            },
            StepStatus::Cancelled => CommandError::Cancelled {
                command: self.command,
                index: step.index,
                step: step.name,
            },
            StepStatus::Failed { exit_code } => CommandError::StepFailed {
                command: self.command,
                index: step.index,
                step: step.name,
                exit_code,
                stdout: step.stdout,
                stderr: step.stderr,
            },
            StepStatus::Success => CommandError::StepFailed {
                command: self.command,
                index: step.index,
                step: step.name,
                exit_code: Some(0),
                stdout: step.stdout,
                stderr: step.stderr,
            },
        })
    }
}

/// Runs pipelines. Holds no state between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run `pipeline` to completion or first stopping failure.
    pub async fn run(&self, pipeline: &Pipeline, env: &ExecutionEnvironment) -> ExecutionResult {
        self.run_with(pipeline, env, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_step` as each step finishes.
    pub async fn run_with<F>(
        &self,
        pipeline: &Pipeline,
        env: &ExecutionEnvironment,
        mut on_step: F,
    ) -> ExecutionResult
    where
        F: FnMut(&StepResult),
    {
        let mut result = ExecutionResult {
            command: pipeline.name().to_owned(),
            steps: Vec::with_capacity(pipeline.steps().len()),
            failed_at: None,
        };

        for (index, step) in pipeline.steps().iter().enumerate() {
            let mut argv = step.exec().to_vec();
            if index == 0 {
                argv.extend(env.extra_args.iter().cloned());
            }

            let step_result = self.run_step(pipeline.name(), index, step, argv, env).await;
            on_step(&step_result);

            let stops = match &step_result.status {
                StepStatus::Success => false,
                StepStatus::Failed { .. } => !step.continue_on_failure(),
                StepStatus::TimedOut(_) | StepStatus::Cancelled => true,
            };
            if !stops && !step_result.status.is_success() {
                warn!(
                    command = pipeline.name(),
                    step = step.name(),
                    index,
                    "step failed, continuing"
                );
            }

            result.steps.push(step_result);
            if stops {
                result.failed_at = Some(result.steps.len().saturating_sub(1));
                break;
            }
        }

        result
    }

    async fn run_step(
        &self,
        command: &str,
        index: usize,
        step: &Step,
        argv: Vec<String>,
        env: &ExecutionEnvironment,
    ) -> StepResult {
        let started = Instant::now();
        let mut result = StepResult {
            index,
            name: step.name().to_owned(),
            argv,
            status: StepStatus::Cancelled,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        };

        if env.cancel.is_cancelled() {
            warn!(command, step = step.name(), index, "cancelled before start");
            return result;
        }

        let cwd = match step.cwd() {
            Some(dir) => env.working_dir.join(dir),
            None => env.working_dir.clone(),
        };
        let timeout = step.timeout().or(env.default_timeout);

        info!(command, step = step.name(), index, program = step.program(), "starting step");

        let mut cmd = Command::new(step.program());
        cmd.args(result.argv.iter().skip(1))
            .current_dir(&cwd)
            .envs(&env.env)
            .envs(step.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command, step = step.name(), program = step.program(), error = %e, "failed to spawn step");
                result.status = StepStatus::Failed { exit_code: None };
                result.stderr = format!(
                    "failed to spawn step: command={command} step={} executable={}: {e}",
                    step.name(),
                    step.program()
                );
                result.duration = started.elapsed();
                return result;
            },
        };

        let pgid = child.id().and_then(|id| i32::try_from(id).ok());
        let mut stdout = tokio::spawn(read_stream(child.stdout.take()));
        let mut stderr = tokio::spawn(read_stream(child.stderr.take()));

        // The deadline covers the output drains as well as the wait.
        let mut out_text: Option<String> = None;
        let mut err_text: Option<String> = None;
        let finished = {
            let completion = async {
                let status = child.wait().await;
                // Background members of the group would keep the pipes open.
                kill_group(pgid);
                tokio::join!(
                    async { out_text = Some((&mut stdout).await.unwrap_or_default()) },
                    async { err_text = Some((&mut stderr).await.unwrap_or_default()) },
                );
                status
            };
            tokio::select! {
                status = completion => Ok(status),
                () = deadline(timeout) => Err(StepStatus::TimedOut(timeout.unwrap_or_default())),
                () = env.cancel.cancelled() => Err(StepStatus::Cancelled),
            }
        };

        match finished {
            Ok(status) => {
                result.status = match status {
                    Ok(status) if status.success() => StepStatus::Success,
                    Ok(status) => StepStatus::Failed {
                        exit_code: status.code(),
                    },
                    Err(e) => {
                        warn!(command, step = step.name(), error = %e, "failed to wait for step");
                        StepStatus::Failed { exit_code: None }
                    },
                };
                result.stdout = out_text.unwrap_or_default();
                result.stderr = err_text.unwrap_or_default();
            },
            Err(status) => {
                kill_group(pgid);
                let _ = child.start_kill();
                let _ = child.wait().await;
                result.stdout = match out_text {
                    Some(text) => text,
                    None => drain(stdout).await,
                };
                result.stderr = match err_text {
                    Some(text) => text,
                    None => drain(stderr).await,
                };
                result.status = status;
            },
        }
        result.duration = started.elapsed();

        info!(
            command,
            step = step.name(),
            index,
            status = result.status.label(),
            duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            "finished step"
        );
        result
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Collect what a reader task gathered, giving up after [`DRAIN_GRACE`].
async fn drain(mut reader: JoinHandle<String>) -> String {
    match tokio::time::timeout(DRAIN_GRACE, &mut reader).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            reader.abort();
            String::new()
        },
    }
}

/// SIGKILL every process left in the step's group.
fn kill_group(pgid: Option<i32>) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {},
            Err(e) => warn!(pgid, error = %e, "failed to kill process group"),
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(name: &str, script: &str) -> Step {
        Step::new(name, "sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_runs_echo_and_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("hello", Step::new("say", "echo").arg("hello"));

        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(result.success());
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].stdout, "hello\n");
        assert_eq!(result.steps[0].status, StepStatus::Success);
    }

    #[tokio::test]
    async fn test_fail_fast_keeps_earlier_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("two", sh("touch", "touch marker"))
            .with_step(sh("boom", "echo oops >&2; exit 3"))
            .with_step(sh("never", "touch never"));

        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(!result.success());
        assert_eq!(result.steps.len(), 2);
        assert!(dir.path().join("marker").exists());
        assert!(!dir.path().join("never").exists());

        let failed = result.failed_step().unwrap();
        assert_eq!(failed.index, 1);
        assert_eq!(failed.status, StepStatus::Failed { exit_code: Some(3) });

        match result.into_result().unwrap_err() {
            CommandError::StepFailed {
                index,
                step,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(step, "boom");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "oops\n");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_continue_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("lenient", sh("flaky", "exit 1").with_continue_on_failure(true))
            .with_step(sh("after", "echo after"));

        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(result.success());
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].stdout, "after\n");
        assert!(result.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_extra_args_only_reach_first_step() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("args", Step::new("first", "echo").arg("a"))
            .with_step(Step::new("second", "echo").arg("b"));
        let env = ExecutionEnvironment::new(dir.path())
            .with_extra_args(["x".to_owned(), "y".to_owned()]);

        let result = PipelineExecutor::new().run(&pipeline, &env).await;
        assert_eq!(result.steps[0].stdout, "a x y\n");
        assert_eq!(result.steps[1].stdout, "b\n");
    }

    #[tokio::test]
    async fn test_cwd_override_and_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let pipeline = Pipeline::new(
            "where",
            sh("pwd", "basename \"$(pwd)\"; echo \"$GLOBAL-$LOCAL\"")
                .with_cwd("sub")
                .with_env("LOCAL", "step"),
        );
        let env = ExecutionEnvironment::new(dir.path()).with_env("GLOBAL", "env");

        let result = PipelineExecutor::new().run(&pipeline, &env).await;
        assert_eq!(result.steps[0].stdout, "sub\nenv-step\n");
    }

    #[tokio::test]
    async fn test_missing_executable_is_step_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            "ghost",
            Step::new("run", "agentcontrol-definitely-missing-binary"),
        );

        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        let failed = result.failed_step().unwrap();
        assert_eq!(failed.status, StepStatus::Failed { exit_code: None });
        assert!(failed.stderr.contains("command=ghost"));
        assert!(failed.stderr.contains("step=run"));
        assert!(failed.stderr.contains("agentcontrol-definitely-missing-binary"));
    }

    #[tokio::test]
    async fn test_timeout_kills_step_and_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            "slow",
            sh("sleep", "sleep 30")
                .with_timeout(Duration::from_millis(200))
                .with_continue_on_failure(true),
        )
        .with_step(sh("never", "touch never"));

        let started = Instant::now();
        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(
            result.steps[0].status,
            StepStatus::TimedOut(Duration::from_millis(200))
        );
        assert!(!dir.path().join("never").exists());
        assert!(matches!(
            result.into_result().unwrap_err(),
            CommandError::TimedOut { index: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_covers_output_held_by_background_process() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            "detached",
            sh("spawn", "sleep 20 & echo started; sleep 20")
                .with_timeout(Duration::from_millis(500)),
        );

        let started = Instant::now();
        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(started.elapsed() < Duration::from_secs(8));
        assert!(matches!(result.steps[0].status, StepStatus::TimedOut(_)));
        assert_eq!(result.steps[0].stdout, "started\n");
    }

    #[tokio::test]
    async fn test_exited_step_does_not_wait_for_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("detached", sh("spawn", "sleep 20 & echo started"))
            .with_step(sh("next", "echo next"));

        let started = Instant::now();
        let result = PipelineExecutor::new()
            .run(&pipeline, &ExecutionEnvironment::new(dir.path()))
            .await;

        assert!(started.elapsed() < Duration::from_secs(8));
        assert!(result.success());
        assert_eq!(result.steps[0].stdout, "started\n");
        assert_eq!(result.steps[1].stdout, "next\n");
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("slow", sh("sleep", "sleep 30"));
        let env = ExecutionEnvironment::new(dir.path())
            .with_default_timeout(Some(Duration::from_millis(200)));

        let result = PipelineExecutor::new().run(&pipeline, &env).await;
        assert!(matches!(result.steps[0].status, StepStatus::TimedOut(_)));
    }

    #[tokio::test]
    async fn test_cancellation_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("long", sh("sleep", "sleep 30"));
        let env = ExecutionEnvironment::new(dir.path());
        let token = env.cancellation_token().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            token.cancel();
        });

        let result = PipelineExecutor::new().run(&pipeline, &env).await;
        assert_eq!(result.steps[0].status, StepStatus::Cancelled);
        assert!(matches!(
            result.into_result().unwrap_err(),
            CommandError::Cancelled { .. }
        ));
    }

    #[tokio::test]
    async fn test_observer_sees_each_step() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("two", Step::new("a", "true"))
            .with_step(Step::new("b", "true"));

        let mut seen = Vec::new();
        let result = PipelineExecutor::new()
            .run_with(&pipeline, &ExecutionEnvironment::new(dir.path()), |s| {
                seen.push(s.name.clone());
            })
            .await;

        assert!(result.success());
        assert_eq!(seen, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_for_project_exports_agentcontrol_vars() {
        let home = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let project = ProjectId::init(root.path()).unwrap();
        let settings = RuntimeSettings::from_home(home.path()).with_version("9.9.9");

        let env = ExecutionEnvironment::for_project(&settings, &project).unwrap();
        let pipeline = Pipeline::new(
            "vars",
            sh("print", "echo \"$AGENTCONTROL_VERSION|$AGENTCONTROL_PROJECT_ROOT\"; test -d \"$AGENTCONTROL_STATE\""),
        );

        let result = PipelineExecutor::new().run(&pipeline, &env).await;
        assert!(result.success(), "{:?}", result.steps[0].stderr);
        assert_eq!(
            result.steps[0].stdout.trim(),
            format!("9.9.9|{}", project.root().display())
        );
    }
}
