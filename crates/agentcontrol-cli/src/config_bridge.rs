//! Bridge from `agentcontrol_config::Config` to the types of the crates that
//! consume it.

use std::path::Path;
use std::time::Duration;

use agentcontrol_config::{ExecutorSection, LoggingSection, PluginFailurePolicy};
use agentcontrol_plugins::FailurePolicy;
use agentcontrol_telemetry::{LogConfig, LogFormat};

/// Convert the `[logging]` section, with `--verbose` forcing `debug`.
/// `to_file` sends output to `log_dir`.
pub(crate) fn to_log_config(
    logging: &LoggingSection,
    log_dir: &Path,
    verbose: bool,
) -> LogConfig {
    let format = logging.format.parse::<LogFormat>().unwrap_or_default();
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let config = LogConfig::new(level).with_format(format);
    if logging.to_file {
        config.with_log_dir(log_dir)
    } else {
        config
    }
}

pub(crate) fn to_failure_policy(policy: PluginFailurePolicy) -> FailurePolicy {
    match policy {
        PluginFailurePolicy::Abort => FailurePolicy::Abort,
        PluginFailurePolicy::Isolate => FailurePolicy::Isolate,
    }
}

/// `default_timeout_secs`, where zero means no deadline.
pub(crate) fn default_timeout(executor: &ExecutorSection) -> Option<Duration> {
    (executor.default_timeout_secs > 0).then(|| Duration::from_secs(executor.default_timeout_secs))
}
