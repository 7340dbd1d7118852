//! Manual subscription corrections and the audited flag.

use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::feedback_service::require_actor;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget, Subscription, SubscriptionPatch};
use crate::domain::ports::{AuditRepository, SubscriptionRepository};

pub struct SubscriptionService<S, A>
where
    S: SubscriptionRepository,
    A: AuditRepository,
{
    subscriptions: Arc<S>,
    audit: Arc<A>,
}

impl<S, A> SubscriptionService<S, A>
where
    S: SubscriptionRepository,
    A: AuditRepository,
{
    pub fn new(subscriptions: Arc<S>, audit: Arc<A>) -> Self {
        Self { subscriptions, audit }
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Subscription> {
        self.subscriptions
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Subscription", id))
    }

    pub async fn list(&self, customer_id: Uuid) -> DomainResult<Vec<Subscription>> {
        self.subscriptions.list_for_customer(customer_id).await
    }

    /// Apply a manual correction of billing attributes.
    ///
    /// A patch that changes nothing returns the subscription as stored and
    /// writes no audit entry.
    #[instrument(skip(self, patch, actor))]
    pub async fn correct_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
        actor: &str,
    ) -> DomainResult<Subscription> {
        if patch.is_empty() {
            return Err(DomainError::Validation(
                "Choose at least one attribute to correct".to_string(),
            ));
        }
        if let Some(currency) = &patch.currency {
            if currency.trim().len() != 3 {
                return Err(DomainError::Validation(format!(
                    "Currency '{currency}' is not a three-letter code"
                )));
            }
        }
        require_actor(actor)?;

        let mut subscription = self.get(id).await?;
        let before = subscription.attributes_snapshot();
        let changed = subscription.apply_correction(patch, actor);
        if changed.is_empty() {
            return Ok(subscription);
        }

        self.subscriptions.update(&subscription).await?;

        let mut after = subscription.attributes_snapshot();
        after["changed"] = serde_json::json!(changed);
        self.record(&subscription, actor, AuditAction::CorrectSubscription, before, after)
            .await?;

        info!(subscription = %subscription.subscription_number, ?changed, "subscription corrected");
        Ok(subscription)
    }

    /// Set the audited flag. Setting it to its current value is a no-op.
    #[instrument(skip(self, actor))]
    pub async fn set_subscription_audited(&self, id: Uuid, audited: bool, actor: &str) -> DomainResult<Subscription> {
        require_actor(actor)?;
        let mut subscription = self.get(id).await?;
        if subscription.audited == audited {
            return Ok(subscription);
        }

        let before = subscription.attributes_snapshot();
        subscription.audited = audited;
        subscription.updated_at = chrono::Utc::now();
        self.subscriptions.update(&subscription).await?;

        let after = subscription.attributes_snapshot();
        self.record(&subscription, actor, AuditAction::SetAudited, before, after)
            .await?;
        Ok(subscription)
    }

    async fn record(
        &self,
        subscription: &Subscription,
        actor: &str,
        action: AuditAction,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> DomainResult<()> {
        let entry = AuditEntry::new(
            actor,
            action,
            AuditTarget::Subscription(subscription.id),
            subscription.customer_id,
            before,
            after,
        );
        self.audit.append(&entry).await.map_err(|e| {
            error!(
                operation = action.as_str(),
                completed_step = "subscription update",
                failed_step = "audit write",
                error = %e,
                "subscription change not audited"
            );
            DomainError::PartialFailure {
                operation: action.as_str(),
                completed: "subscription update",
                failed: "audit write",
                reason: e.to_string(),
            }
        })
    }
}
