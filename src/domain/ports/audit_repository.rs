//! Audit trail repository port.
//!
//! Append-only: entries are never updated or deleted.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget};

/// Filter criteria for reading the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub customer_id: Option<Uuid>,
    pub target: Option<AuditTarget>,
    pub action: Option<AuditAction>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> DomainResult<()>;

    /// Entries matching the filter, newest first.
    async fn list(&self, filter: AuditFilter) -> DomainResult<Vec<AuditEntry>>;
}
