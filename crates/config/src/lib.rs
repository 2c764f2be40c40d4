//! Configuration loading, validation, and management for Folio.
//!
//! Loads configuration from `~/.folio/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use folio_core::StateDefaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.folio/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Context store limits and eviction schedule
    #[serde(default)]
    pub store: StoreConfig,

    /// Report defaults
    #[serde(default)]
    pub report: ReportConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Serialized context size (characters) above which `update` compacts.
    #[serde(default = "default_size_ceiling")]
    pub size_ceiling: usize,

    /// Enhancements kept by compaction.
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Contexts idle longer than this are evicted by the sweeper.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_size_ceiling() -> usize {
    5_000
}
fn default_retention() -> usize {
    5
}
fn default_idle_ttl_secs() -> u64 {
    3_600
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            size_ceiling: default_size_ceiling(),
            retention: default_retention(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StoreConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Symbol used when a prompt names no known instrument.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default = "default_theme")]
    pub default_theme: String,

    #[serde(default = "default_layout")]
    pub default_layout: String,

    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,

    #[serde(default = "default_metrics")]
    pub default_metrics: Vec<String>,
}

fn default_symbol() -> String {
    "AAPL".into()
}
fn default_theme() -> String {
    "light".into()
}
fn default_layout() -> String {
    "standard".into()
}
fn default_timeframe() -> String {
    "1 Year".into()
}
fn default_metrics() -> Vec<String> {
    StateDefaults::default().metrics
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_symbol: default_symbol(),
            default_theme: default_theme(),
            default_layout: default_layout(),
            default_timeframe: default_timeframe(),
            default_metrics: default_metrics(),
        }
    }
}

impl ReportConfig {
    /// Initial state values for new contexts.
    pub fn state_defaults(&self) -> StateDefaults {
        StateDefaults {
            metrics: self.default_metrics.clone(),
            timeframe: self.default_timeframe.clone(),
            theme: self.default_theme.clone(),
            layout: self.default_layout.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum request body in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_port() -> u16 {
    42718
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit: default_body_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path with env var overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `FOLIO_*` overrides. `lookup` resolves a variable name.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FOLIO_SIZE_CEILING") {
            self.store.size_ceiling = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("FOLIO_SIZE_CEILING is not a number: {raw}"))
            })?;
        }

        if let Some(symbol) = lookup("FOLIO_DEFAULT_SYMBOL") {
            self.report.default_symbol = symbol.trim().to_uppercase();
        }

        if let Some(raw) = lookup("FOLIO_PORT") {
            self.gateway.port = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("FOLIO_PORT is not a port: {raw}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".folio")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.size_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "store.size_ceiling must be > 0".into(),
            ));
        }

        if self.store.retention == 0 {
            return Err(ConfigError::ValidationError(
                "store.retention must be at least 1".into(),
            ));
        }

        if self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "store.sweep_interval_secs must be at least 1".into(),
            ));
        }

        if self.report.default_symbol.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "report.default_symbol must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML (for `folio config`).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
