//! Category operations: rename, merge, catalog maintenance and summaries.
//!
//! Rename and merge are not transactional. Each step is committed as it
//! runs; a failure after the record update is reported as a partial failure
//! naming the step that completed and the step that failed.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::feedback_service::require_actor;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AuditAction, AuditEntry, AuditTarget, CategoryCatalogEntry, CategoryStats, LineItemClassification,
};
use crate::domain::ports::{
    AuditRepository, CandidateQuery, CategoryRepository, ClassificationPatch, ClassificationRepository,
};

/// Number of records moved by a rename or merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOpOutcome {
    pub from_category: String,
    pub to_category: String,
    pub prpc_count: u64,
}

pub struct CategoryService<C, K, A>
where
    C: ClassificationRepository,
    K: CategoryRepository,
    A: AuditRepository,
{
    classifications: Arc<C>,
    categories: Arc<K>,
    audit: Arc<A>,
}

impl<C, K, A> CategoryService<C, K, A>
where
    C: ClassificationRepository,
    K: CategoryRepository,
    A: AuditRepository,
{
    pub fn new(classifications: Arc<C>, categories: Arc<K>, audit: Arc<A>) -> Self {
        Self {
            classifications,
            categories,
            audit,
        }
    }

    /// Rename a category for one customer.
    ///
    /// Steps: move the records, rename the customer's catalog entry (or add
    /// one under the new name when the old name only exists globally), then
    /// write one audit entry.
    #[instrument(skip(self, actor))]
    pub async fn rename(
        &self,
        customer_id: Uuid,
        old_name: &str,
        new_name: &str,
        actor: &str,
    ) -> DomainResult<CategoryOpOutcome> {
        let (old_name, new_name) = validate_names(old_name, new_name)?;
        require_actor(actor)?;

        if self.has_records(customer_id, new_name).await?
            || self
                .categories
                .find(customer_id, new_name)
                .await?
                .is_some_and(|entry| !entry.is_global())
        {
            return Err(DomainError::Validation(format!(
                "Category '{new_name}' already exists; merge '{old_name}' into it instead"
            )));
        }

        let records = self.records_in(customer_id, old_name).await?;
        let old_entry = self.categories.find(customer_id, old_name).await?;
        if records.is_empty() && old_entry.is_none() {
            return Err(DomainError::not_found("Category", old_name));
        }

        let prpc_count = self.reassign(&records, new_name).await?;

        let catalog_step = async {
            let renamed = self.categories.rename(customer_id, old_name, new_name).await?;
            if renamed == 0 {
                let mut entry = CategoryCatalogEntry::for_customer(customer_id, new_name);
                entry.pattern_of_business_name = old_entry
                    .as_ref()
                    .and_then(|e| e.pattern_of_business_name.clone());
                self.categories.insert_if_absent(&entry).await?;
            }
            Ok::<_, DomainError>(())
        };
        catalog_step
            .await
            .map_err(|e| partial_failure("rename category", "record update", "catalog update", &e))?;

        self.record(
            customer_id,
            actor,
            AuditAction::RenameCategory,
            old_name,
            new_name,
            prpc_count,
        )
        .await
        .map_err(|e| partial_failure("rename category", "record and catalog update", "audit write", &e))?;

        info!(%customer_id, from = old_name, to = new_name, prpc_count, "category renamed");
        Ok(CategoryOpOutcome {
            from_category: old_name.to_string(),
            to_category: new_name.to_string(),
            prpc_count,
        })
    }

    /// Move every record in `from` into the existing category `to`.
    ///
    /// The catalog is left untouched. Merging an empty category is a no-op
    /// and writes no audit entry.
    #[instrument(skip(self, actor))]
    pub async fn merge(
        &self,
        customer_id: Uuid,
        from: &str,
        to: &str,
        actor: &str,
    ) -> DomainResult<CategoryOpOutcome> {
        let (from, to) = validate_names(from, to)?;
        require_actor(actor)?;

        if self.categories.find(customer_id, to).await?.is_none() && !self.has_records(customer_id, to).await? {
            return Err(DomainError::not_found("Category", to));
        }

        let records = self.records_in(customer_id, from).await?;
        let outcome = CategoryOpOutcome {
            from_category: from.to_string(),
            to_category: to.to_string(),
            prpc_count: 0,
        };
        if records.is_empty() {
            info!(%customer_id, from, to, "nothing to merge");
            return Ok(outcome);
        }

        let prpc_count = self.reassign(&records, to).await?;
        self.record(customer_id, actor, AuditAction::MergeCategory, from, to, prpc_count)
            .await
            .map_err(|e| partial_failure("merge category", "record update", "audit write", &e))?;

        info!(%customer_id, from, to, prpc_count, "categories merged");
        Ok(CategoryOpOutcome { prpc_count, ..outcome })
    }

    /// Per-category summary for a customer.
    pub async fn stats(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryStats>> {
        self.classifications.category_stats(customer_id).await
    }

    /// Catalog visible to a customer: its own entries plus unshadowed globals.
    pub async fn list_catalog(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryCatalogEntry>> {
        self.categories.list_for_customer(customer_id).await
    }

    /// Add a customer-scoped category. Returns false when the name is already
    /// visible to the customer.
    pub async fn add_category(
        &self,
        customer_id: Uuid,
        name: &str,
        pattern_of_business: Option<&str>,
    ) -> DomainResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("Category name cannot be empty".to_string()));
        }
        if self.categories.find(customer_id, name).await?.is_some() {
            return Ok(false);
        }

        let mut entry = CategoryCatalogEntry::for_customer(customer_id, name);
        if let Some(pob) = pattern_of_business.map(str::trim).filter(|p| !p.is_empty()) {
            entry = entry.with_pattern_of_business(pob);
        }
        self.categories.insert_if_absent(&entry).await
    }

    async fn records_in(&self, customer_id: Uuid, category: &str) -> DomainResult<Vec<LineItemClassification>> {
        let query = CandidateQuery {
            category: Some(category.to_string()),
            ..CandidateQuery::for_customer(customer_id, usize::MAX)
        };
        self.classifications.find_candidates(&query).await
    }

    async fn has_records(&self, customer_id: Uuid, category: &str) -> DomainResult<bool> {
        let query = CandidateQuery {
            category: Some(category.to_string()),
            ..CandidateQuery::for_customer(customer_id, 1)
        };
        Ok(!self.classifications.find_candidates(&query).await?.is_empty())
    }

    async fn reassign(&self, records: &[LineItemClassification], category: &str) -> DomainResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        self.classifications
            .update_many(&ids, &ClassificationPatch::recategorize(category))
            .await
            .inspect_err(|e| warn!(error = %e, category, "record update failed"))
    }

    async fn record(
        &self,
        customer_id: Uuid,
        actor: &str,
        action: AuditAction,
        from: &str,
        to: &str,
        prpc_count: u64,
    ) -> DomainResult<()> {
        let entry = AuditEntry::new(
            actor,
            action,
            AuditTarget::CategoryOp(customer_id),
            customer_id,
            json!({ "from_category": from, "prpc_count": prpc_count }),
            json!({ "to_category": to, "prpc_count": prpc_count }),
        );
        self.audit.append(&entry).await
    }
}

fn validate_names<'a>(from: &'a str, to: &'a str) -> DomainResult<(&'a str, &'a str)> {
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || to.is_empty() {
        return Err(DomainError::Validation("Category names cannot be empty".to_string()));
    }
    if from == to {
        return Err(DomainError::Validation(format!(
            "Source and target category are both '{from}'"
        )));
    }
    Ok((from, to))
}

fn partial_failure(
    operation: &'static str,
    completed: &'static str,
    failed: &'static str,
    cause: &DomainError,
) -> DomainError {
    error!(
        operation,
        completed_step = completed,
        failed_step = failed,
        error = %cause,
        "category operation partially applied"
    );
    DomainError::PartialFailure {
        operation,
        completed,
        failed,
        reason: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteAuditRepository, SqliteCategoryRepository,
        SqliteClassificationRepository,
    };
    use crate::domain::ports::AuditFilter;

    type Service = CategoryService<SqliteClassificationRepository, SqliteCategoryRepository, SqliteAuditRepository>;

    struct Fixture {
        service: Service,
        classifications: Arc<SqliteClassificationRepository>,
        categories: Arc<SqliteCategoryRepository>,
        audit: Arc<SqliteAuditRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_migrated_test_pool().await.unwrap();
        let classifications = Arc::new(SqliteClassificationRepository::new(pool.clone()));
        let categories = Arc::new(SqliteCategoryRepository::new(pool.clone()));
        let audit = Arc::new(SqliteAuditRepository::new(pool));
        Fixture {
            service: CategoryService::new(classifications.clone(), categories.clone(), audit.clone()),
            classifications,
            categories,
            audit,
        }
    }

    async fn seed(f: &Fixture, customer: Uuid, category: &str, n: usize) -> Vec<LineItemClassification> {
        let items: Vec<_> = (0..n)
            .map(|i| LineItemClassification::new(customer, format!("Product {category} {i}"), "Plan", "Charge", category))
            .collect();
        f.classifications.insert_many(&items).await.unwrap();
        items
    }

    async fn categories_of(f: &Fixture, items: &[LineItemClassification]) -> Vec<String> {
        let mut out = Vec::new();
        for item in items {
            out.push(f.classifications.get(item.id).await.unwrap().unwrap().inferred_category);
        }
        out
    }

    #[tokio::test]
    async fn test_merge_moves_records_and_writes_one_entry() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        let hybrid = seed(&f, customer, "Hybrid", 3).await;

        let outcome = f.service.merge(customer, "Hybrid", "Tech", "ana").await.unwrap();
        assert_eq!(outcome.prpc_count, 3);
        assert!(categories_of(&f, &hybrid).await.iter().all(|c| c == "Tech"));

        let entries = f.audit.list(AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::MergeCategory);
        assert_eq!(entries[0].target, AuditTarget::CategoryOp(customer));
        assert_eq!(entries[0].before_json["from_category"], "Hybrid");
        assert_eq!(entries[0].after_json["to_category"], "Tech");
        assert_eq!(entries[0].after_json["prpc_count"], 3);
    }

    #[tokio::test]
    async fn test_merge_of_empty_category_is_silent() {
        let f = setup().await;
        let customer = Uuid::new_v4();

        let outcome = f.service.merge(customer, "Hybrid", "Tech", "ana").await.unwrap();
        assert_eq!(outcome.prpc_count, 0);
        assert!(f.audit.list(AuditFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_into_unknown_category_is_not_found() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        seed(&f, customer, "Hybrid", 1).await;

        let err = f.service.merge(customer, "Hybrid", "Nope", "ana").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_merge_into_itself_is_rejected() {
        let f = setup().await;
        let err = f.service.merge(Uuid::new_v4(), "Tech", " Tech ", "ana").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rename_moves_records_and_catalog_entry() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        f.categories
            .insert_if_absent(&CategoryCatalogEntry::for_customer(customer, "Usage").with_pattern_of_business("Metered"))
            .await
            .unwrap();
        let usage = seed(&f, customer, "Usage", 2).await;

        let outcome = f.service.rename(customer, "Usage", "Usage Based", "ana").await.unwrap();
        assert_eq!(outcome.prpc_count, 2);
        assert!(categories_of(&f, &usage).await.iter().all(|c| c == "Usage Based"));

        assert!(f.categories.find(customer, "Usage").await.unwrap().is_none());
        let renamed = f.categories.find(customer, "Usage Based").await.unwrap().unwrap();
        assert_eq!(renamed.pattern_of_business_name.as_deref(), Some("Metered"));

        let entries = f.audit.list(AuditFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::RenameCategory);
        assert_eq!(entries[0].before_json["prpc_count"], 2);
    }

    #[tokio::test]
    async fn test_rename_of_global_category_adds_customer_entry() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        seed(&f, customer, "Hybrid", 1).await;

        f.service.rename(customer, "Hybrid", "Blended", "ana").await.unwrap();

        let entry = f.categories.find(customer, "Blended").await.unwrap().unwrap();
        assert_eq!(entry.customer_id, Some(customer));
        // The global entry stays for everyone else.
        assert!(f.categories.find(Uuid::new_v4(), "Hybrid").await.unwrap().unwrap().is_global());
    }

    #[tokio::test]
    async fn test_rename_round_trip_restores_records() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        let usage = seed(&f, customer, "Usage", 3).await;

        f.service.rename(customer, "Usage", "Metered", "ana").await.unwrap();
        f.service.rename(customer, "Metered", "Usage", "ana").await.unwrap();

        assert!(categories_of(&f, &usage).await.iter().all(|c| c == "Usage"));
        assert_eq!(f.audit.list(AuditFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_onto_existing_category_suggests_merge() {
        let f = setup().await;
        let customer = Uuid::new_v4();
        seed(&f, customer, "Hybrid", 1).await;
        seed(&f, customer, "Tech", 1).await;

        let err = f.service.rename(customer, "Hybrid", "Tech", "ana").await.unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("merge")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rename_unknown_category_is_not_found() {
        let f = setup().await;
        let err = f
            .service
            .rename(Uuid::new_v4(), "Nothing Here", "Something", "ana")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_category_is_idempotent() {
        let f = setup().await;
        let customer = Uuid::new_v4();

        assert!(f.service.add_category(customer, "Usage Based", Some("Metered")).await.unwrap());
        assert!(!f.service.add_category(customer, "Usage Based", None).await.unwrap());
        assert!(!f.service.add_category(customer, "Hardware", None).await.unwrap());

        let catalog = f.service.list_catalog(customer).await.unwrap();
        assert_eq!(catalog.iter().filter(|e| e.category_name == "Usage Based").count(), 1);
    }
}
