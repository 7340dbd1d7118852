//! Classification repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CategoryStats, ClassificationStatus, LineItemClassification};

/// Candidate selection for a feedback request.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub customer_id: Uuid,
    /// Exact match on `inferred_category`.
    pub category: Option<String>,
    /// Only records whose confidence is below this value.
    pub confidence_below: Option<f64>,
    pub limit: usize,
}

impl CandidateQuery {
    pub fn for_customer(customer_id: Uuid, limit: usize) -> Self {
        Self {
            customer_id,
            category: None,
            confidence_below: None,
            limit,
        }
    }
}

/// Fields written by a batch update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationPatch {
    pub category: Option<String>,
    pub pattern_of_business: Option<String>,
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
    pub status: Option<ClassificationStatus>,
    pub reviewed: Option<(String, DateTime<Utc>)>,
}

impl ClassificationPatch {
    pub fn recategorize(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            status: Some(ClassificationStatus::UserAdjusted),
            ..Default::default()
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Apply the patch to an in-memory copy, mirroring what the store writes.
    pub fn apply_to(&self, item: &mut LineItemClassification) {
        if let Some(category) = &self.category {
            item.inferred_category.clone_from(category);
        }
        if let Some(pob) = &self.pattern_of_business {
            item.inferred_pattern_of_business = Some(pob.clone());
        }
        if let Some(rationale) = &self.rationale {
            item.rationale.clone_from(rationale);
        }
        if let Some(confidence) = self.confidence {
            item.confidence = Some(confidence);
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some((by, at)) = &self.reviewed {
            item.last_reviewed_by = Some(by.clone());
            item.last_reviewed_at = Some(*at);
        }
    }
}

/// Repository interface for line-item classifications.
#[async_trait]
pub trait ClassificationRepository: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, item: &LineItemClassification) -> DomainResult<()>;

    /// Insert many records in one transaction. Returns the number inserted.
    async fn insert_many(&self, items: &[LineItemClassification]) -> DomainResult<u64>;

    /// Get a record by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<LineItemClassification>>;

    /// Fetch candidates ordered by product, rate plan, charge and id.
    async fn find_candidates(&self, query: &CandidateQuery) -> DomainResult<Vec<LineItemClassification>>;

    /// Write `patch` to every record in `ids` with a single statement.
    /// Returns rows affected.
    async fn update_many(&self, ids: &[Uuid], patch: &ClassificationPatch) -> DomainResult<u64>;

    /// Replace a record's mutable fields.
    async fn update(&self, item: &LineItemClassification) -> DomainResult<()>;

    /// Per-category aggregates for a customer.
    async fn category_stats(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryStats>>;
}
