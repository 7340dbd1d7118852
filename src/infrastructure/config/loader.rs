use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::MAX_PROMPT_SAMPLE;

/// Directory holding project configuration and the default database.
pub const CONFIG_DIR: &str = ".revclass";

/// Upper bound on `matching.candidate_cap`.
pub const MAX_CANDIDATE_CAP: usize = 10_000;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Classifier {0} cannot be empty")]
    EmptyClassifierField(&'static str),

    #[error("Invalid classifier timeout: {0}. Must be at least 1 second")]
    InvalidTimeout(u64),

    #[error("Invalid sample_size: {0}. Must be between 1 and {MAX_PROMPT_SAMPLE}")]
    InvalidSampleSize(usize),

    #[error("Invalid candidate_cap: {0}. Must be between 1 and {MAX_CANDIDATE_CAP}")]
    InvalidCandidateCap(usize),

    #[error("Invalid low_confidence_threshold: {0}. Must be strictly between 0 and 1")]
    InvalidThreshold(f64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .revclass/config.yaml (project config, created by init)
    /// 3. .revclass/local.yaml (project local overrides, optional)
    /// 4. Environment variables (REVCLASS_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
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
            .merge(Env::prefixed("REVCLASS_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")))
            .merge(Env::prefixed("REVCLASS_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if config.classifier.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyClassifierField("base_url"));
        }
        if config.classifier.model.trim().is_empty() {
            return Err(ConfigError::EmptyClassifierField("model"));
        }
        if config.classifier.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.classifier.timeout_secs));
        }
        if !(1..=MAX_PROMPT_SAMPLE).contains(&config.classifier.sample_size) {
            return Err(ConfigError::InvalidSampleSize(config.classifier.sample_size));
        }

        if !(1..=MAX_CANDIDATE_CAP).contains(&config.matching.candidate_cap) {
            return Err(ConfigError::InvalidCandidateCap(config.matching.candidate_cap));
        }
        let threshold = config.matching.low_confidence_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        Ok(())
    }
}
