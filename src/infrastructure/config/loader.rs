use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Executable cannot be empty")]
    EmptyExecutable,

    #[error("Invalid bootstrap_interval_secs: {0}. Must be at least 1")]
    InvalidBootstrapInterval(u64),

    #[error("Invalid requeue_delay_secs: {0}. Must be at least 1")]
    InvalidRequeueDelay(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Kind table cannot be empty")]
    EmptyKindTable,

    #[error("Duplicate kind in kind table: {0}")]
    DuplicateKind(String),

    #[error("Kind '{0}' has no key field")]
    EmptyKeyField(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .meshward/config.yaml (project config)
    /// 3. .meshward/local.yaml (project local overrides, optional)
    /// 4. Environment variables (MESHWARD_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(None)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Self::figment(Some(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(path: Option<&std::path::Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(".meshward/config.yaml"))
                .merge(Yaml::file(".meshward/local.yaml")),
        };
        figment.merge(Env::prefixed("MESHWARD_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.executable.trim().is_empty() {
            return Err(ConfigError::EmptyExecutable);
        }

        if config.bootstrap_interval_secs == 0 {
            return Err(ConfigError::InvalidBootstrapInterval(
                config.bootstrap_interval_secs,
            ));
        }

        if config.requeue_delay_secs == 0 {
            return Err(ConfigError::InvalidRequeueDelay(config.requeue_delay_secs));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        // Validate kind table
        if config.kinds.is_empty() {
            return Err(ConfigError::EmptyKindTable);
        }

        let mut seen = HashSet::new();
        for kind in config.kinds.iter() {
            if kind.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Kind name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(kind.name.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateKind(kind.name.clone()));
            }
            if kind.key_field.trim().is_empty() {
                return Err(ConfigError::EmptyKeyField(kind.name.clone()));
            }
        }

        if config.revisions.edge_workload.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "revisions.edge_workload cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
