use anyhow::Context;
use exporter_config::load_config;
use exporter_config::shared::ExporterConfig;

/// Loads `configuration/base` and the environment overlay, then validates the result.
pub fn load_exporter_config() -> anyhow::Result<ExporterConfig> {
    let config = load_config::<ExporterConfig>().context("failed to load exporter configuration")?;
    config
        .validate()
        .context("exporter configuration is invalid")?;

    Ok(config)
}
