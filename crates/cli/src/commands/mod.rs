pub mod classify;
pub mod config_cmd;
pub mod enhance;
pub mod serve;

use std::path::Path;

use folio_config::AppConfig;

/// Load the default config file, or `path` when given, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}
