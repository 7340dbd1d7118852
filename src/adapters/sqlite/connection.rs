//! SQLite pool construction for the record store.
//!
//! The store is a single file under the workspace directory. Only
//! `revclass init` creates it; every other command opens it with
//! [`OpenMode::ExistingOnly`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Record store not found at {}", .0.display())]
    NotInitialized(PathBuf),
    #[error("Failed to create store directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open record store: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Record store is not responding: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

/// Whether opening may create the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    ExistingOnly,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Writers wait this long on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            ..Self::default()
        }
    }
}

/// Open the store file at `path`.
pub async fn create_pool(path: &Path, mode: OpenMode, config: &PoolConfig) -> Result<SqlitePool, ConnectionError> {
    match mode {
        OpenMode::Create => ensure_parent_dir(path)?,
        OpenMode::ExistingOnly if !path.exists() => {
            return Err(ConnectionError::NotInitialized(path.to_path_buf()));
        }
        OpenMode::ExistingOnly => {}
    }

    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(mode == OpenMode::Create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

/// Private in-memory store with a single connection.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    // Each parse of `:memory:` gets its own shared-cache name.
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(ConnectionError::PoolCreationFailed)?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConnectionError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|source| ConnectionError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::ConnectionFailed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_mode_makes_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("revclass.db");

        let pool = create_pool(&db_path, OpenMode::Create, &PoolConfig::default()).await.unwrap();
        verify_connection(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_existing_only_refuses_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("revclass.db");

        let err = create_pool(&db_path, OpenMode::ExistingOnly, &PoolConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::NotInitialized(p) if p == db_path));
        assert!(!db_path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_pools_are_isolated() {
        let first = create_test_pool().await.unwrap();
        let second = create_test_pool().await.unwrap();
        sqlx::query("CREATE TABLE marker (id INTEGER)").execute(&first).await.unwrap();

        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'marker'")
                .fetch_optional(&second)
                .await
                .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_pool_config_from_database_config() {
        let db = DatabaseConfig {
            path: "x.db".to_string(),
            max_connections: 0,
        };
        assert_eq!(PoolConfig::from(&db).max_connections, 1);
    }
}
