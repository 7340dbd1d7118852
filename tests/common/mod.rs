//! Common test utilities for integration tests
//!
//! Fixtures shared by the pipeline and category-operation tests: an
//! in-memory store with all migrations applied, seeded line items, and an
//! audit repository that can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use revclass::adapters::sqlite::{
    create_migrated_test_pool, SqliteAuditRepository, SqliteCategoryRepository,
    SqliteClassificationRepository,
};
use revclass::domain::errors::{DomainError, DomainResult};
use revclass::domain::models::{AuditEntry, LineItemClassification};
use revclass::domain::ports::{AuditFilter, AuditRepository, ClassificationRepository};

/// Repositories over one in-memory database.
pub struct TestStore {
    pub classifications: Arc<SqliteClassificationRepository>,
    pub categories: Arc<SqliteCategoryRepository>,
    pub audit: Arc<SqliteAuditRepository>,
}

impl TestStore {
    pub async fn new() -> Self {
        let pool = create_migrated_test_pool()
            .await
            .expect("Failed to create test database");
        Self {
            classifications: Arc::new(SqliteClassificationRepository::new(pool.clone())),
            categories: Arc::new(SqliteCategoryRepository::new(pool.clone())),
            audit: Arc::new(SqliteAuditRepository::new(pool)),
        }
    }

    pub async fn seed(&self, items: &[LineItemClassification]) {
        self.classifications
            .insert_many(items)
            .await
            .expect("Failed to seed line items");
    }

    pub async fn reload(&self, id: Uuid) -> LineItemClassification {
        self.classifications
            .get(id)
            .await
            .expect("Failed to load line item")
            .expect("line item missing")
    }

    pub async fn audit_count(&self) -> usize {
        self.audit
            .list(AuditFilter::default())
            .await
            .expect("Failed to list audit entries")
            .len()
    }
}

/// `count` line items named "<prefix> <n>" in `category`, all at `confidence`.
pub fn line_items(
    customer: Uuid,
    prefix: &str,
    category: &str,
    confidence: f64,
    count: usize,
) -> Vec<LineItemClassification> {
    (0..count)
        .map(|i| {
            LineItemClassification::new(customer, format!("{prefix} {i}"), "Annual", "Base Fee", category)
                .with_confidence(confidence)
        })
        .collect()
}

/// Audit repository wrapper that fails every append while `failing` is set.
pub struct FlakyAuditRepository {
    inner: Arc<SqliteAuditRepository>,
    failing: AtomicBool,
}

impl FlakyAuditRepository {
    pub fn failing(inner: Arc<SqliteAuditRepository>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(true),
        }
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditRepository for FlakyAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> DomainResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::DataAccess("audit store offline".to_string()));
        }
        self.inner.append(entry).await
    }

    async fn list(&self, filter: AuditFilter) -> DomainResult<Vec<AuditEntry>> {
        self.inner.list(filter).await
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
