//! SQLite database adapters for the revclass record store.

pub mod audit_repository;
pub mod category_repository;
pub mod classification_repository;
pub mod connection;
pub mod migrations;
pub mod subscription_repository;

pub use audit_repository::SqliteAuditRepository;
pub use category_repository::SqliteCategoryRepository;
pub use classification_repository::SqliteClassificationRepository;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, OpenMode, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use subscription_repository::SqliteSubscriptionRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::Serialization(format!("bad id '{s}': {e}")))
}

/// Parse an optional UUID column.
pub fn parse_optional_uuid(s: Option<String>) -> DomainResult<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Serialization(format!("bad timestamp '{s}': {e}")))
}

/// Parse an optional RFC3339 column.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_datetime).transpose()
}

/// Parse a JSON string from a SQLite row field, falling back to the type's default.
pub fn parse_json_or_default<T: serde::de::DeserializeOwned + Default>(s: Option<String>) -> DomainResult<T> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| DomainError::Serialization(e.to_string()))
        .map(Option::unwrap_or_default)
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl DatabaseError {
    /// True when the store file does not exist yet.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::Connection(ConnectionError::NotInitialized(_)))
    }
}

/// Open (and if needed create) the store at `path`, then apply pending
/// migrations. Returns the pool and the number of migrations applied.
pub async fn open_store(
    path: &Path,
    mode: OpenMode,
    pool_config: &PoolConfig,
) -> Result<(SqlitePool, usize), DatabaseError> {
    let pool = create_pool(path, mode, pool_config).await?;
    let applied = Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok((pool, applied))
}

/// Open the configured store. It must already exist.
pub async fn open_existing_store(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let (pool, applied) = open_store(Path::new(&config.path), OpenMode::ExistingOnly, &PoolConfig::from(config)).await?;
    if applied > 0 {
        tracing::info!(applied, path = %config.path, "record store schema upgraded");
    }
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok(pool)
}
