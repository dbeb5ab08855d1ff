use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::domain::app_config::AppConfig;
use crate::domain::error::{AppError, Result};

pub const CONFIG_PATH_ENV: &str = "TAXONOMY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "taxonomy.toml";
const ENV_PREFIX: &str = "TAXONOMY_";

/// Loads `.env`, then layers defaults < toml file < `TAXONOMY_*` env vars.
pub fn load_config() -> Result<AppConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    let path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;

    config.validate().map_err(AppError::ConfigError)?;
    Ok(config)
}
