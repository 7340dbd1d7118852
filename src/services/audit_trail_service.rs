//! Read access to the audit trail.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget};
use crate::domain::ports::{AuditFilter, AuditRepository};

pub struct AuditTrailService<A: AuditRepository> {
    audit: Arc<A>,
}

impl<A: AuditRepository> AuditTrailService<A> {
    pub fn new(audit: Arc<A>) -> Self {
        Self { audit }
    }

    /// Entries for a customer, newest first, optionally limited to one action.
    pub async fn for_customer(
        &self,
        customer_id: Uuid,
        action: Option<AuditAction>,
        limit: Option<usize>,
    ) -> DomainResult<Vec<AuditEntry>> {
        self.audit
            .list(AuditFilter {
                customer_id: Some(customer_id),
                action,
                limit,
                ..AuditFilter::default()
            })
            .await
    }

    /// History of a single line item, subscription or customer's category operations.
    pub async fn for_target(&self, target: AuditTarget, limit: Option<usize>) -> DomainResult<Vec<AuditEntry>> {
        self.audit
            .list(AuditFilter {
                target: Some(target),
                limit,
                ..AuditFilter::default()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteAuditRepository};
    use serde_json::json;

    #[tokio::test]
    async fn test_filters_by_customer_action_and_target() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteAuditRepository::new(pool));
        let service = AuditTrailService::new(repo.clone());

        let customer = Uuid::new_v4();
        let item = Uuid::new_v4();
        for (action, target) in [
            (AuditAction::Reclassify, AuditTarget::Classification(item)),
            (AuditAction::Approve, AuditTarget::Classification(item)),
            (AuditAction::MergeCategory, AuditTarget::CategoryOp(customer)),
        ] {
            repo.append(&AuditEntry::new("ana", action, target, customer, json!({}), json!({})))
                .await
                .unwrap();
        }
        repo.append(&AuditEntry::new(
            "bo",
            AuditAction::Approve,
            AuditTarget::Classification(Uuid::new_v4()),
            Uuid::new_v4(),
            json!({}),
            json!({}),
        ))
        .await
        .unwrap();

        assert_eq!(service.for_customer(customer, None, None).await.unwrap().len(), 3);
        let approvals = service
            .for_customer(customer, Some(AuditAction::Approve), None)
            .await
            .unwrap();
        assert_eq!(approvals.len(), 1);

        let history = service.for_target(AuditTarget::Classification(item), Some(1)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, AuditAction::Approve);
    }
}
