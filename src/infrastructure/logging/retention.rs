//! Log file retention
//!
//! Rolling appenders never delete old files. Files in the log directory
//! whose name starts with the log base name and whose modification time is
//! older than the retention window are removed at startup.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

use super::logger::LOG_FILE_NAME;

#[derive(Debug, Clone)]
pub struct LogRetention {
    retention_days: u32,
}

impl LogRetention {
    pub fn new(retention_days: u32) -> Self {
        Self { retention_days }
    }

    /// Delete expired log files. Returns the number deleted.
    pub async fn cleanup_old_logs(&self, log_dir: impl AsRef<Path>) -> Result<usize> {
        let log_dir = log_dir.as_ref();

        if !log_dir.exists() {
            debug!(path = %log_dir.display(), "log directory does not exist");
            return Ok(0);
        }

        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        let mut deleted_count = 0;

        let mut entries = tokio::fs::read_dir(log_dir)
            .await
            .context("failed to read log directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("failed to read directory entry")?
        {
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_NAME));
            if !is_log {
                continue;
            }

            let modified: DateTime<Utc> = tokio::fs::metadata(&path)
                .await
                .context("failed to get file metadata")?
                .modified()
                .context("failed to get file modification time")?
                .into();

            if modified < cutoff {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "deleted expired log file");
                        deleted_count += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to delete expired log file"),
                }
            }
        }

        if deleted_count > 0 {
            info!(count = deleted_count, "cleaned up old log files");
        }

        Ok(deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_directory_is_noop() {
        let retention = LogRetention::new(30);
        let deleted = retention.cleanup_old_logs("/nonexistent/revclass/logs").await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_recent_and_foreign_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("revclass.log.2026-10-18");
        let other = dir.path().join("notes.txt");
        std::fs::write(&log, "{}").unwrap();
        std::fs::write(&other, "keep").unwrap();

        let deleted = LogRetention::new(30).cleanup_old_logs(dir.path()).await.unwrap();

        assert_eq!(deleted, 0);
        assert!(log.exists());
        assert!(other.exists());
    }
}
