//! Schema versioning for the record store.
//!
//! Migrations are plain SQL files compiled into the binary. Each runs in its
//! own transaction together with the `schema_migrations` row that records it.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
    #[error("Record store is at schema version {found}, newer than this build supports ({known})")]
    NewerSchema { found: i64, known: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Line items, catalog, subscriptions and audit log",
        sql: include_str!("../../../migrations/001_initial_schema.sql"),
    },
    Migration {
        version: 2,
        description: "Seed global category vocabulary",
        sql: include_str!("../../../migrations/002_seed_global_categories.sql"),
    },
];

/// Every migration this build knows, in version order.
pub fn all_embedded_migrations() -> &'static [Migration] {
    MIGRATIONS
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded schema version.
    /// Returns the number applied.
    pub async fn run_embedded_migrations(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;

        let known = migrations.iter().map(|m| m.version).max().unwrap_or(0);
        if current_version > known {
            return Err(MigrationError::NewerSchema {
                found: current_version,
                known,
            });
        }

        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current_version) {
            self.apply_migration(migration).await?;
            info!(version = migration.version, description = migration.description, "applied migration");
            applied += 1;
        }
        if applied == 0 {
            debug!(current_version, "schema up to date");
        }
        Ok(applied)
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|source| MigrationError::ExecutionError { version: 0, source })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
        Ok(version)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        let to_error = |source| MigrationError::ExecutionError {
            version: migration.version,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(to_error)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(to_error)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(to_error)?;
        tx.commit().await.map_err(to_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_test_pool;

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());

        let applied = migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(migrator.get_current_version().await.unwrap(), 2);

        let applied = migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_global_categories_seeded() {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM category_catalog WHERE customer_id IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 11);
    }

    #[tokio::test]
    async fn test_store_from_newer_build_is_refused() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (99, 'future')")
            .execute(&pool)
            .await
            .unwrap();

        let err = migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap_err();
        assert!(matches!(err, MigrationError::NewerSchema { found: 99, known: 2 }));
    }
}
