pub mod config;
pub mod demo;
pub mod serve;

use anyhow::Context;
use safe_core::config::SafeConfig;
use std::path::Path;

/// Resolve the configuration from `--config`, `./safe.yaml`, or defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> anyhow::Result<SafeConfig> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (config, source) = SafeConfig::discover(explicit, &cwd).context("failed to load config")?;
    match source {
        Some(path) => tracing::debug!(path = %path.display(), "configuration loaded"),
        None => tracing::debug!("no configuration file, using defaults"),
    }
    Ok(config)
}

/// Warn once about API keys the configured providers will need.
pub(crate) fn warn_missing_keys(config: &SafeConfig) {
    for env in config.missing_api_keys() {
        tracing::warn!("{env} is not set; agents using that provider will fail");
    }
}
