//! revclass CLI entry point.

use clap::Parser;

use revclass::cli::{handle_error, run, Cli};
use revclass::infrastructure::config::ConfigLoader;
use revclass::infrastructure::logging::{LogConfig, LogRetention, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, json),
    };

    let log_config = match LogConfig::try_from(&config.logging) {
        Ok(log_config) => log_config,
        Err(err) => handle_error(err, json),
    };
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json),
    };

    if let Some(log_dir) = &log_config.log_dir {
        match LogRetention::new(log_config.retention_days).cleanup_old_logs(log_dir).await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "old log files pruned"),
            Err(err) => tracing::warn!(error = %err, "log retention cleanup failed"),
        }
    }

    if let Err(err) = run(cli, config).await {
        handle_error(err, json);
    }
}
