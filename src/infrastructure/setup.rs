//! Workspace initialization
//!
//! Handles project initialization:
//! - Configuration directory creation
//! - Default config file creation
//! - Database creation and migrations

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::config::CONFIG_DIR;
use crate::adapters::sqlite::{open_store, OpenMode, PoolConfig};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# revclass configuration
# Override settings by editing this file, by adding .revclass/local.yaml,
# or by setting environment variables with the REVCLASS_ prefix
#
# Example environment variables:
#   export REVCLASS_DATABASE__PATH=/custom/path/revclass.db
#   export REVCLASS_LOGGING__LEVEL=debug
#   export REVCLASS_CLASSIFIER__MODEL=gpt-4o
#   export REVCLASS_CLASSIFIER_API_KEY=...   (or OPENAI_API_KEY)

database:
  # Path to SQLite database file (project-local)
  path: ".revclass/revclass.db"
  max_connections: 5

logging:
  # trace, debug, info, warn, error
  level: "info"
  # json, pretty
  format: "pretty"
  # Uncomment to also write JSON log files
  # log_dir: ".revclass/logs"
  rotation: "daily"
  retention_days: 30

classifier:
  # Any OpenAI-compatible chat completions endpoint
  base_url: "https://api.openai.com/v1"
  model: "gpt-4o-mini"
  timeout_secs: 60
  # Line items shown to the model per feedback request (1-100)
  sample_size: 100
  temperature: 0.2

matching:
  # Records fetched per customer for one feedback request (1-10000)
  candidate_cap: 10000
  low_confidence_threshold: 0.4
"#;

/// Setup paths and directories
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl SetupPaths {
    /// Setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::for_dir(&current_dir))
    }

    pub fn for_dir(root: &Path) -> Self {
        let config_dir = root.join(CONFIG_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            database_file: config_dir.join("revclass.db"),
            config_dir,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

/// Create the configuration directory
pub fn create_config_dir(paths: &SetupPaths) -> Result<()> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;
    Ok(())
}

/// Create the default configuration file. Returns false when one already
/// exists and `force` is off.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;
    Ok(true)
}

/// Create the record store if needed and apply pending migrations.
/// Returns the number of migrations applied.
pub async fn run_migrations(paths: &SetupPaths) -> Result<usize> {
    let (pool, applied) = open_store(&paths.database_file, OpenMode::Create, &PoolConfig::default())
        .await
        .with_context(|| format!("Failed to prepare record store at {}", paths.database_file.display()))?;
    pool.close().await;
    Ok(applied)
}
