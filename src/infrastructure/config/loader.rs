use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, MAX_INTERVAL_SECS, MAX_LIVE_DURATION_SECS};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".eventpulse";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid reconciler interval: {0}s. Must be at least 1 second")]
    InvalidInterval(u64),

    #[error("Reconciler interval too long: {0}s. Must be at most {MAX_INTERVAL_SECS} seconds")]
    IntervalTooLong(u64),

    #[error("Invalid live duration: {0}s. Must be at least 1 second")]
    InvalidLiveDuration(u64),

    #[error("Live duration too long: {0}s. Must be at most {MAX_LIVE_DURATION_SECS} seconds")]
    LiveDurationTooLong(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid cache max_capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .eventpulse/config.yaml (project config, created by init)
    /// 3. .eventpulse/local.yaml (project local overrides, optional)
    /// 4. Environment variables (EVENTPULSE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(CONFIG_DIR))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("EVENTPULSE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The provider stack rooted at `config_dir`.
    pub fn figment(config_dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed("EVENTPULSE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.reconciler.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval(config.reconciler.interval_secs));
        }

        if config.reconciler.interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooLong(config.reconciler.interval_secs));
        }

        if config.reconciler.live_duration_secs == 0 {
            return Err(ConfigError::InvalidLiveDuration(
                config.reconciler.live_duration_secs,
            ));
        }

        if config.reconciler.live_duration_secs > MAX_LIVE_DURATION_SECS {
            return Err(ConfigError::LiveDurationTooLong(
                config.reconciler.live_duration_secs,
            ));
        }

        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.cache.max_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.max_capacity));
        }

        Ok(())
    }
}
