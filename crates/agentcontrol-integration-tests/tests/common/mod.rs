//! Shared harness for integration tests.

use agentcontrol_commands::{
    CommandRegistry, ExecutionEnvironment, ExecutionResult, ManifestLoader, PipelineExecutor,
};
use agentcontrol_plugins::{LoadReport, ManifestDiscovery, PluginLoader, StaticDiscovery};
use agentcontrol_test::{TestHome, TestProject};

/// A home and a project wired together the way `agentcall` wires them.
#[allow(dead_code)]
pub struct Harness {
    /// Isolated home directory.
    pub home: TestHome,
    /// Project with its capsule.
    pub project: TestProject,
}

#[allow(dead_code)]
impl Harness {
    /// A harness whose project manifest is `manifest`.
    pub fn new(manifest: &str) -> Self {
        agentcontrol_test::init_test_tracing();
        Self {
            home: TestHome::new(),
            project: TestProject::with_manifest(manifest),
        }
    }

    /// The default plugin loader: built-ins plus standard manifest
    /// directories.
    pub fn loader(&self) -> PluginLoader {
        PluginLoader::new()
            .with_discovery(StaticDiscovery::builtin())
            .with_discovery(ManifestDiscovery::standard(
                self.home.settings(),
                Some(self.project.id()),
                &[],
            ))
    }

    /// Manifest pipelines followed by plugin commands.
    pub fn registry_with(&self, loader: &PluginLoader) -> (CommandRegistry, LoadReport) {
        let manifest = ManifestLoader::parse(&self.project.id().manifest_path())
            .expect("manifest should parse");
        let mut registry = CommandRegistry::from_pipelines(manifest.into_pipelines())
            .expect("manifest names are unique");
        let report = loader
            .load_into(&mut registry, self.home.settings())
            .expect("plugins should load");
        (registry, report)
    }

    /// [`registry_with`](Self::registry_with) using [`loader`](Self::loader).
    pub fn registry(&self) -> CommandRegistry {
        self.registry_with(&self.loader()).0
    }

    /// Environment for running the project's pipelines.
    pub fn environment(&self) -> ExecutionEnvironment {
        ExecutionEnvironment::for_project(self.home.settings(), self.project.id())
            .expect("state dir should be creatable")
    }

    /// Run a registered pipeline by name.
    pub async fn run(&self, name: &str) -> ExecutionResult {
        self.run_in(name, self.environment()).await
    }

    /// Run a registered pipeline by name in `env`.
    pub async fn run_in(&self, name: &str, env: ExecutionEnvironment) -> ExecutionResult {
        let registry = self.registry();
        let pipeline = registry.pipeline(name).expect("pipeline should exist");
        PipelineExecutor::new().run(pipeline, &env).await
    }
}
