//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid worker concurrency: {0}. Must be between 1 and 64")]
    InvalidConcurrency(usize),

    #[error("Invalid scheduler poll interval: {0}s. Must be positive")]
    InvalidPollInterval(u64),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidPipeline(String),
}

/// Loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `sercha.yaml` (project config)
    /// 3. `sercha.local.yaml` (local overrides, optional)
    /// 4. Environment variables (`SERCHA_*`, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("sercha.yaml"))
            .merge(Yaml::file("sercha.local.yaml"))
            .merge(Env::prefixed("SERCHA_").split("__"))
            .extract()
            .context("Failed to extract configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a loaded configuration.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.workers.concurrency == 0 || config.workers.concurrency > 64 {
            return Err(ConfigError::InvalidConcurrency(config.workers.concurrency));
        }

        if config.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval(
                config.scheduler.poll_interval_secs,
            ));
        }

        config
            .pipeline
            .validate()
            .map_err(ConfigError::InvalidPipeline)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.workers.concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "workers:\n  concurrency: 8\nscheduler:\n  poll_interval_secs: 10\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.workers.concurrency, 8);
        assert_eq!(config.scheduler.poll_interval_secs, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.auth.token_ttl_hours, 24);
    }
}
