use crate::config::model::Config;
use anyhow::Context;
use std::path::Path;

pub fn load_config_from_path(config_path: &Path) -> Result<Config, anyhow::Error> {
    let config_str = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config file {}", config_path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("failed to parse config file {}", config_path.display()))?;
    Ok(config)
}
