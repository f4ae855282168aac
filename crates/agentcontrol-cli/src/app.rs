//! Per-invocation state: settings, configuration, project and telemetry.

use std::path::{Path, PathBuf};
use std::time::Instant;

use agentcontrol_commands::{CommandRegistry, ManifestLoader};
use agentcontrol_config::Config;
use agentcontrol_core::{ProjectError, ProjectId, ProjectLocator, ProjectResult, RuntimeSettings};
use agentcontrol_plugins::{LoadReport, ManifestDiscovery, PluginLoader, StaticDiscovery};
use agentcontrol_telemetry::{EventRecorder, TelemetryEvent, setup_logging};
use anyhow::{Context, Result};
use tracing::debug;

use crate::config_bridge;

/// Everything a subcommand needs, resolved once in `main`.
pub(crate) struct App {
    settings: RuntimeSettings,
    config: Config,
    start_dir: PathBuf,
    project: ProjectResult<ProjectId>,
    events: EventRecorder,
}

impl App {
    /// Resolve settings, locate the project, load configuration and start
    /// logging.
    ///
    /// A missing project is not an error here; subcommands that need one
    /// get it from [`project`](Self::project).
    pub(crate) fn bootstrap(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let settings = RuntimeSettings::resolve().context("failed to resolve AgentControl home")?;
        settings
            .ensure()
            .with_context(|| format!("failed to create {}", settings.home_dir.display()))?;

        let (start_dir, project) = match path {
            Some(path) => {
                let project = ProjectLocator::resolve(&path);
                (path, project)
            },
            None => {
                let cwd = std::env::current_dir()?;
                let project = ProjectLocator::discover(&cwd);
                (cwd, project)
            },
        };

        let project_config = project.as_ref().ok().map(ProjectId::config_path);
        let resolved = Config::load(
            Some(settings.config_path().as_path()),
            project_config.as_deref(),
        )?;

        let log_config =
            config_bridge::to_log_config(&resolved.config.logging, &settings.log_dir, verbose);
        if let Err(e) = setup_logging(&log_config) {
            eprintln!("Failed to initialize logging: {e}");
        }
        debug!(files = ?resolved.loaded_files, "Configuration loaded");

        Ok(Self {
            events: EventRecorder::for_log_dir(&settings.log_dir),
            settings,
            config: resolved.config,
            start_dir,
            project,
        })
    }

    pub(crate) fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// `--path`, or the working directory.
    pub(crate) fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    /// The project for this invocation.
    pub(crate) fn project(&self) -> ProjectResult<&ProjectId> {
        self.project.as_ref().map_err(reissue)
    }

    /// The project, if there is one.
    pub(crate) fn project_opt(&self) -> Option<&ProjectId> {
        self.project.as_ref().ok()
    }

    /// Plugin loader over the built-in table and the standard plugin
    /// directories.
    pub(crate) fn plugin_loader(&self) -> PluginLoader {
        PluginLoader::new()
            .with_policy(config_bridge::to_failure_policy(
                self.config.plugins.failure_policy,
            ))
            .with_discovery(StaticDiscovery::builtin())
            .with_discovery(ManifestDiscovery::standard(
                &self.settings,
                self.project_opt(),
                &self.config.plugins.extra_dirs,
            ))
    }

    /// Manifest pipelines followed by plugin commands.
    pub(crate) fn load_registry(
        &self,
        project: &ProjectId,
    ) -> Result<(CommandRegistry, LoadReport)> {
        let manifest = ManifestLoader::parse(&project.manifest_path())?;
        let mut registry = CommandRegistry::from_pipelines(manifest.into_pipelines())?;
        let report = self
            .plugin_loader()
            .load_into(&mut registry, &self.settings)?;
        debug!(
            commands = registry.len(),
            plugins = report.loaded.len(),
            "Command registry ready"
        );
        Ok((registry, report))
    }

    /// Append a telemetry event. Failures are logged, never fatal.
    pub(crate) fn record(&self, event: &TelemetryEvent) {
        if let Err(e) = self.events.record(event) {
            debug!(event = %event.event, error = %e, "Failed to record telemetry event");
        }
    }

    /// Run `f` between a `start` event and a `success`/`failure` event.
    pub(crate) fn recorded<T>(
        &self,
        event: &str,
        component: &str,
        payload: serde_json::Value,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.record(
            &TelemetryEvent::new(event)
                .with_status("start")
                .with_component(component)
                .with_payload(payload.clone()),
        );
        let started = Instant::now();
        let outcome = f();
        let finished = TelemetryEvent::new(event)
            .with_component(component)
            .with_duration(started.elapsed())
            .with_payload(payload);
        let finished = match &outcome {
            Ok(_) => finished.with_status("success"),
            Err(_) => finished.with_status("failure").with_level("error"),
        };
        self.record(&finished);
        outcome
    }
}

/// A fresh copy of a stored resolution error.
fn reissue(error: &ProjectError) -> ProjectError {
    match error {
        ProjectError::NotInitialised { root } => ProjectError::NotInitialised { root: root.clone() },
        ProjectError::LegacyLayout {
            root,
            legacy_manifest,
        } => ProjectError::LegacyLayout {
            root: root.clone(),
            legacy_manifest: legacy_manifest.clone(),
        },
        ProjectError::AlreadyInitialised(path) => ProjectError::AlreadyInitialised(path.clone()),
        ProjectError::Io(e) => ProjectError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}
