//! Update applier.
//!
//! Writes a validated decision to the store and records provenance. Order is
//! fixed: catalog bootstrap, then the record update, then audit entries. A
//! failed update writes no audit entry; audit fan-out runs only after the
//! update has succeeded.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget, CategoryCatalogEntry, LineItemClassification};
use crate::domain::ports::{AuditRepository, CategoryRepository, ClassificationPatch, ClassificationRepository};

pub struct UpdateApplier<C, K, A>
where
    C: ClassificationRepository,
    K: CategoryRepository,
    A: AuditRepository,
{
    classifications: Arc<C>,
    categories: Arc<K>,
    audit: Arc<A>,
}

impl<C, K, A> UpdateApplier<C, K, A>
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

    /// Make sure `category` is in the customer's visible catalog.
    ///
    /// An entry that already exists (customer-scoped or global) is left alone;
    /// a concurrent insert of the same name counts as success.
    pub async fn ensure_category(&self, customer_id: Uuid, category: &str) -> DomainResult<()> {
        if self.categories.find(customer_id, category).await?.is_some() {
            return Ok(());
        }

        let inserted = self
            .categories
            .insert_if_absent(&CategoryCatalogEntry::for_customer(customer_id, category))
            .await?;
        debug!(%customer_id, category, inserted, "catalog entry ensured");
        Ok(())
    }

    /// Move every record in `matched` to `new_category` in one statement and
    /// write one audit entry per record. Returns the number of rows updated.
    pub async fn apply_bulk(
        &self,
        customer_id: Uuid,
        actor: &str,
        matched: &[LineItemClassification],
        new_category: &str,
        rationale: &str,
    ) -> DomainResult<u64> {
        if matched.is_empty() {
            return Ok(0);
        }

        self.ensure_category(customer_id, new_category).await?;

        let patch = ClassificationPatch::recategorize(new_category).with_rationale(rationale);
        let ids: Vec<Uuid> = matched.iter().map(|item| item.id).collect();
        let updated = self.classifications.update_many(&ids, &patch).await?;

        let entries: Vec<AuditEntry> = matched
            .iter()
            .map(|item| {
                let mut after = item.clone();
                patch.apply_to(&mut after);
                AuditEntry::new(
                    actor,
                    AuditAction::CategoryFeedback,
                    AuditTarget::Classification(item.id),
                    customer_id,
                    item.audit_snapshot(),
                    after.audit_snapshot(),
                )
            })
            .collect();

        self.append_all(AuditAction::CategoryFeedback.as_str(), &entries).await?;
        Ok(updated)
    }

    /// Persist a single record change and its audit entry.
    pub async fn apply_item(
        &self,
        actor: &str,
        action: AuditAction,
        before: &LineItemClassification,
        after: &LineItemClassification,
    ) -> DomainResult<()> {
        self.classifications.update(after).await?;

        let entry = AuditEntry::new(
            actor,
            action,
            AuditTarget::Classification(after.id),
            after.customer_id,
            before.audit_snapshot(),
            after.audit_snapshot(),
        );
        self.append_all(action.as_str(), std::slice::from_ref(&entry)).await
    }

    /// Append entries concurrently. Records are already updated at this
    /// point, so any failure is reported as a partial failure.
    async fn append_all(&self, operation: &'static str, entries: &[AuditEntry]) -> DomainResult<()> {
        let results = join_all(entries.iter().map(|entry| self.audit.append(entry))).await;

        let failures: Vec<DomainError> = results.into_iter().filter_map(Result::err).collect();
        if let Some(first) = failures.first() {
            error!(
                operation,
                completed_step = "record update",
                failed_step = "audit write",
                failed = failures.len(),
                total = entries.len(),
                error = %first,
                "audit entries missing after update"
            );
            return Err(DomainError::PartialFailure {
                operation,
                completed: "record update",
                failed: "audit write",
                reason: first.to_string(),
            });
        }
        Ok(())
    }
}

/// Stamp a reviewer on an in-memory record.
pub(crate) fn stamp_reviewer(item: &mut LineItemClassification, actor: &str) {
    let now = Utc::now();
    item.last_reviewed_by = Some(actor.to_string());
    item.last_reviewed_at = Some(now);
    item.updated_at = now;
}
