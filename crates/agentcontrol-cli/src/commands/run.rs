//! Run command - execute a pipeline or plugin command.

use std::collections::BTreeMap;
use std::time::Instant;

use agentcontrol_commands::{
    CommandEntry, ExecutionEnvironment, Pipeline, PipelineExecutor, RegisteredCommand, StepResult,
    StepStatus,
};
use agentcontrol_core::{PluginContext, ProjectId, exit};
use agentcontrol_sandbox::{SandboxDescriptor, SandboxError, SandboxManager};
use agentcontrol_telemetry::TelemetryEvent;
use serde_json::json;
use tracing::{debug, warn};

use crate::app::App;
use crate::commands::sandbox::provision;
use crate::config_bridge;
use crate::theme::Theme;

/// Which sandbox, if any, a pipeline run gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SandboxChoice {
    /// No sandbox.
    None,
    /// An existing sandbox by id.
    Existing(String),
    /// A sandbox created for this run and kept afterwards.
    Fresh,
}

impl SandboxChoice {
    pub(crate) fn from_flags(sandbox: Option<String>, new_sandbox: bool) -> Self {
        match (sandbox, new_sandbox) {
            (Some(id), _) => Self::Existing(id),
            (None, true) => Self::Fresh,
            (None, false) => Self::None,
        }
    }
}

/// Resolve `name` in the registry and run it. Returns the exit code.
pub(crate) async fn run_command(
    app: &App,
    name: &str,
    args: Vec<String>,
    sandbox: SandboxChoice,
) -> anyhow::Result<i32> {
    let project = app.project()?;
    let (registry, report) = app.load_registry(project)?;

    match registry.get(name)? {
        CommandEntry::Pipeline(pipeline) => {
            run_pipeline(app, project, pipeline, args, sandbox).await
        },
        CommandEntry::Plugin(command) => {
            if sandbox != SandboxChoice::None {
                eprintln!(
                    "{}",
                    Theme::warning("Sandbox options apply to pipelines only; ignoring")
                );
            }
            run_plugin(command, &report.context, args).await
        },
    }
}

async fn run_pipeline(
    app: &App,
    project: &ProjectId,
    pipeline: &Pipeline,
    args: Vec<String>,
    sandbox: SandboxChoice,
) -> anyhow::Result<i32> {
    let mut env = ExecutionEnvironment::for_project(app.settings(), project)?
        .with_envs(app.config().executor.env.clone())
        .with_extra_args(args)
        .with_default_timeout(config_bridge::default_timeout(&app.config().executor));
    if let Some(descriptor) = attach_sandbox(app, project, sandbox)? {
        env = env.with_sandbox(&descriptor.path);
    }

    let token = env.cancellation_token().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let payload = json!({ "command": pipeline.name(), "path": project.root() });
    app.record(
        &TelemetryEvent::new("pipeline")
            .with_status("start")
            .with_component("executor")
            .with_payload(payload.clone()),
    );

    let started = Instant::now();
    let result = PipelineExecutor::new()
        .run_with(pipeline, &env, report_step)
        .await;
    interrupt.abort();

    let finished = TelemetryEvent::new("pipeline")
        .with_component("executor")
        .with_duration(started.elapsed())
        .with_payload(json!({
            "command": pipeline.name(),
            "path": project.root(),
            "steps": result.steps.len(),
            "failed_step": result.failed_step().map(|s| s.name.clone()),
        }));
    app.record(&if result.success() {
        finished.with_status("success")
    } else {
        finished.with_status("failure").with_level("error")
    });

    result.into_result()?;
    Ok(exit::SUCCESS)
}

fn attach_sandbox(
    app: &App,
    project: &ProjectId,
    choice: SandboxChoice,
) -> anyhow::Result<Option<SandboxDescriptor>> {
    let manager = SandboxManager::new(project);
    match choice {
        SandboxChoice::None => Ok(None),
        SandboxChoice::Existing(id) => {
            let descriptor = manager.get(&id)?.ok_or(SandboxError::NotFound(id))?;
            debug!(sandbox_id = %descriptor.sandbox_id, "Attaching sandbox");
            Ok(Some(descriptor))
        },
        SandboxChoice::Fresh => {
            let kind = app.config().sandbox.default_kind.clone();
            let descriptor = provision(app, &manager, &kind, BTreeMap::new())?;
            eprintln!(
                "{}",
                Theme::info(&format!(
                    "Sandbox {} at {}",
                    descriptor.sandbox_id,
                    descriptor.path.display()
                ))
            );
            Ok(Some(descriptor))
        },
    }
}

/// Echo a finished step's output and outcome.
fn report_step(step: &StepResult) {
    if !step.stdout.is_empty() {
        print!("{}", step.stdout);
    }
    if !step.stderr.is_empty() {
        eprint!("{}", step.stderr);
    }

    let label = format!("{} {}", step.name, Theme::duration(step.duration));
    let line = match &step.status {
        StepStatus::Success => Theme::success(&label),
        StepStatus::Failed {
            exit_code: Some(code),
        } => Theme::error(&format!("{label} exited with {code}")),
        StepStatus::Failed { exit_code: None } => Theme::error(&format!("{label} failed")),
        StepStatus::TimedOut(timeout) => {
            Theme::error(&format!("{label} timed out after {timeout:?}"))
        },
        StepStatus::Cancelled => Theme::warning(&format!("{label} cancelled")),
    };
    eprintln!("{line}");
}

async fn run_plugin(
    command: &RegisteredCommand,
    ctx: &PluginContext,
    args: Vec<String>,
) -> anyhow::Result<i32> {
    let name = command.name().to_owned();
    let built = command.build(
        clap::Command::new(name.clone())
            .bin_name(format!("agentcall {name}"))
            .about(command.help().to_owned()),
        ctx,
    );

    let argv = std::iter::once(name.clone()).chain(args);
    let matches = match built.command.clone().try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(e) => {
            e.print()?;
            return Ok(if e.use_stderr() {
                exit::USAGE
            } else {
                exit::SUCCESS
            });
        },
    };

    debug!(command = %name, source = command.source(), "Running plugin command");
    let code = tokio::task::spawn_blocking(move || built.invoke(&matches)).await?;
    if code != exit::SUCCESS {
        warn!(command = %name, code, "Plugin command failed");
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_choice_from_flags() {
        assert_eq!(SandboxChoice::from_flags(None, false), SandboxChoice::None);
        assert_eq!(SandboxChoice::from_flags(None, true), SandboxChoice::Fresh);
        assert_eq!(
            SandboxChoice::from_flags(Some("x".into()), false),
            SandboxChoice::Existing("x".into())
        );
    }
}
