//! Per-invocation wiring: configuration, database pool and services.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::classifier::{OpenAiClassifier, OpenAiClassifierConfig};
use crate::adapters::sqlite::{
    open_existing_store, SqliteAuditRepository, SqliteCategoryRepository,
    SqliteClassificationRepository, SqliteSubscriptionRepository,
};
use crate::domain::models::Config;
use crate::services::{
    AuditTrailService, CategoryService, FeedbackService, ImportService, SubscriptionService,
};

pub type SqliteFeedbackService =
    FeedbackService<SqliteClassificationRepository, SqliteCategoryRepository, SqliteAuditRepository>;
pub type SqliteCategoryService =
    CategoryService<SqliteClassificationRepository, SqliteCategoryRepository, SqliteAuditRepository>;
pub type SqliteSubscriptionService = SubscriptionService<SqliteSubscriptionRepository, SqliteAuditRepository>;
pub type SqliteImportService = ImportService<SqliteClassificationRepository, SqliteSubscriptionRepository>;

pub struct AppContext {
    pub config: Config,
    pub actor: String,
    pool: SqlitePool,
}

impl AppContext {
    pub async fn open(config: Config, actor: String) -> Result<Self> {
        let pool = match open_existing_store(&config.database).await {
            Ok(pool) => pool,
            Err(err) if err.is_not_initialized() => {
                bail!("{err}. Run 'revclass init' first.")
            }
            Err(err) => return Err(err).context("Failed to open record store"),
        };
        Ok(Self { config, actor, pool })
    }

    pub fn classifications(&self) -> Arc<SqliteClassificationRepository> {
        Arc::new(SqliteClassificationRepository::new(self.pool.clone()))
    }

    fn categories(&self) -> Arc<SqliteCategoryRepository> {
        Arc::new(SqliteCategoryRepository::new(self.pool.clone()))
    }

    fn subscriptions(&self) -> Arc<SqliteSubscriptionRepository> {
        Arc::new(SqliteSubscriptionRepository::new(self.pool.clone()))
    }

    fn audit(&self) -> Arc<SqliteAuditRepository> {
        Arc::new(SqliteAuditRepository::new(self.pool.clone()))
    }

    /// Needs a classifier API key; the other services do not.
    pub fn feedback_service(&self) -> Result<SqliteFeedbackService> {
        let classifier = OpenAiClassifier::new(OpenAiClassifierConfig::from(&self.config.classifier))?;
        Ok(FeedbackService::new(
            self.classifications(),
            self.categories(),
            self.audit(),
            Arc::new(classifier),
            self.config.matching.clone(),
            self.config.classifier.sample_size,
        ))
    }

    pub fn category_service(&self) -> SqliteCategoryService {
        CategoryService::new(self.classifications(), self.categories(), self.audit())
    }

    pub fn subscription_service(&self) -> SqliteSubscriptionService {
        SubscriptionService::new(self.subscriptions(), self.audit())
    }

    pub fn audit_trail_service(&self) -> AuditTrailService<SqliteAuditRepository> {
        AuditTrailService::new(self.audit())
    }

    pub fn import_service(&self) -> SqliteImportService {
        ImportService::new(self.classifications(), self.subscriptions())
    }
}
