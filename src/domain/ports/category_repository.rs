//! Category catalog repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::CategoryCatalogEntry;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert an entry. Returns `false` when the name already exists in the
    /// same scope; a duplicate is not an error.
    async fn insert_if_absent(&self, entry: &CategoryCatalogEntry) -> DomainResult<bool>;

    /// Find an active entry visible to the customer (customer-scoped first, then global).
    async fn find(&self, customer_id: Uuid, name: &str) -> DomainResult<Option<CategoryCatalogEntry>>;

    /// Rename the customer's own entry. Returns rows affected.
    async fn rename(&self, customer_id: Uuid, old_name: &str, new_name: &str) -> DomainResult<u64>;

    /// Active entries visible to the customer, ordered by name.
    async fn list_for_customer(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryCatalogEntry>>;
}
