//! User and project configuration layered over the embedded defaults.

use std::collections::HashMap;

use agentcontrol_config::{PluginFailurePolicy, loader};
use agentcontrol_test::{TestHome, TestProject};

#[test]
fn test_project_layer_overrides_user_layer() {
    let home = TestHome::new();
    let project = TestProject::new();
    home.write_config(
        "[logging]\nlevel = \"debug\"\n\n[executor]\ndefault_timeout_secs = 30\n\n[executor.env]\nSHARED = \"user\"\nUSER_ONLY = \"1\"\n",
    );
    std::fs::write(
        project.id().config_path(),
        "[executor]\ndefault_timeout_secs = 5\n\n[executor.env]\nSHARED = \"project\"\n\n[plugins]\nfailure_policy = \"isolate\"\n",
    )
    .unwrap();

    let resolved = loader::load(
        Some(home.settings().config_path().as_path()),
        Some(project.id().config_path().as_path()),
        &HashMap::new(),
    )
    .unwrap();

    let config = resolved.config;
    assert_eq!(resolved.loaded_files.len(), 2);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.executor.default_timeout_secs, 5);
    assert_eq!(config.executor.env["SHARED"], "project");
    assert_eq!(config.executor.env["USER_ONLY"], "1");
    assert_eq!(config.plugins.failure_policy, PluginFailurePolicy::Isolate);
    assert_eq!(config.sandbox.default_kind, "sandbox");
}

#[test]
fn test_missing_layers_fall_back_to_defaults() {
    let home = TestHome::new();
    let project = TestProject::new();

    let resolved = loader::load(
        Some(home.settings().config_path().as_path()),
        Some(project.id().config_path().as_path()),
        &HashMap::new(),
    )
    .unwrap();

    assert!(resolved.loaded_files.is_empty());
    assert_eq!(resolved.config.plugins.failure_policy, PluginFailurePolicy::Abort);
    assert!(!resolved.config.logging.to_file);
}

#[test]
fn test_environment_beats_files() {
    let home = TestHome::new();
    home.write_config("[logging]\nlevel = \"debug\"\n");
    let env = HashMap::from([("AGENTCONTROL_LOG_LEVEL".to_owned(), "error".to_owned())]);

    let resolved =
        loader::load(Some(home.settings().config_path().as_path()), None, &env).unwrap();
    assert_eq!(resolved.config.logging.level, "error");
}
