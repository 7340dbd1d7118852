//! `revclass init`: create the workspace directory, config file and record store.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::setup::{create_config_dir, create_config_file, run_migrations, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Reset an existing config file to defaults
    #[arg(long, short)]
    pub force: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    pub already_initialized: bool,
    pub config_written: bool,
    pub migrations_applied: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![match (self.already_initialized, self.config_written) {
            (false, _) => "Workspace initialized.".to_string(),
            (true, true) => "Workspace reinitialized; config reset to defaults.".to_string(),
            (true, false) => "Workspace already initialized.".to_string(),
        }];
        if self.config_written {
            lines.push(format!("Config:       {}", self.config_file.display()));
        }
        lines.push(format!("Record store: {}", self.database_file.display()));
        if self.migrations_applied > 0 {
            lines.push(format!("Applied {} schema migration(s)", self.migrations_applied));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let root = if args.path.is_absolute() {
        args.path
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(args.path)
    };

    let paths = SetupPaths::for_dir(&root);
    let already_initialized = paths.is_initialized();

    create_config_dir(&paths)?;
    let config_written = create_config_file(&paths, args.force)?;
    let migrations_applied = run_migrations(&paths).await?;

    output(
        &InitOutput {
            config_file: paths.config_file,
            database_file: paths.database_file,
            already_initialized,
            config_written,
            migrations_applied,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_twice_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = || InitArgs {
            force: false,
            path: dir.path().to_path_buf(),
        };

        execute(args(), true).await.unwrap();
        let paths = SetupPaths::for_dir(dir.path());
        assert!(paths.is_initialized());

        std::fs::write(&paths.config_file, "logging:\n  level: debug\n").unwrap();
        execute(args(), true).await.unwrap();
        let kept = std::fs::read_to_string(&paths.config_file).unwrap();
        assert!(kept.contains("level: debug"));
    }

    #[test]
    fn test_human_output_for_rerun() {
        let out = InitOutput {
            config_file: PathBuf::from("/w/.revclass/config.yaml"),
            database_file: PathBuf::from("/w/.revclass/revclass.db"),
            already_initialized: true,
            config_written: false,
            migrations_applied: 0,
        };
        let text = out.to_human();
        assert!(text.starts_with("Workspace already initialized."));
        assert!(!text.contains("Config:"));
        assert!(text.contains("revclass.db"));
    }
}
