//! Subscription repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Subscription;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn insert(&self, subscription: &Subscription) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Subscription>>;

    /// Replace a subscription's mutable fields.
    async fn update(&self, subscription: &Subscription) -> DomainResult<()>;

    /// Record that the subscription bills the given classified line item.
    async fn link_line_item(&self, subscription_id: Uuid, classification_id: Uuid) -> DomainResult<()>;

    async fn list_for_customer(&self, customer_id: Uuid) -> DomainResult<Vec<Subscription>>;
}
