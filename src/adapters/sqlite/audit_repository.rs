//! SQLite implementation of the AuditRepository.
//!
//! The table carries triggers that abort any UPDATE or DELETE, so the trail
//! stays append-only even for code that bypasses this adapter.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget};
use crate::domain::ports::{AuditFilter, AuditRepository};

#[derive(Clone)]
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> DomainResult<()> {
        sqlx::query(
            r"INSERT INTO audit_entries (id, actor, action, entity_type, entity_id, customer_id,
                                         before_json, after_json, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(&entry.actor)
        .bind(entry.action.as_str())
        .bind(entry.target.entity_type())
        .bind(entry.target.entity_id().to_string())
        .bind(entry.customer_id.to_string())
        .bind(serde_json::to_string(&entry.before_json)?)
        .bind(serde_json::to_string(&entry.after_json)?)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: AuditFilter) -> DomainResult<Vec<AuditEntry>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, actor, action, entity_type, entity_id, customer_id, before_json, after_json, created_at \
             FROM audit_entries WHERE 1=1",
        );

        if let Some(customer_id) = filter.customer_id {
            builder.push(" AND customer_id = ").push_bind(customer_id.to_string());
        }
        if let Some(target) = filter.target {
            builder
                .push(" AND entity_type = ")
                .push_bind(target.entity_type())
                .push(" AND entity_id = ")
                .push_bind(target.entity_id().to_string());
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }

        builder.push(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows: Vec<AuditRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: String,
    actor: String,
    action: String,
    entity_type: String,
    entity_id: String,
    customer_id: String,
    before_json: String,
    after_json: String,
    created_at: String,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let action = AuditAction::from_str(&row.action)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid audit action: {}", row.action)))?;
        let target = AuditTarget::from_parts(&row.entity_type, parse_uuid(&row.entity_id)?)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid entity type: {}", row.entity_type)))?;

        Ok(AuditEntry {
            id: parse_uuid(&row.id)?,
            actor: row.actor,
            action,
            target,
            customer_id: parse_uuid(&row.customer_id)?,
            before_json: serde_json::from_str(&row.before_json)?,
            after_json: serde_json::from_str(&row.after_json)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use serde_json::json;
    use uuid::Uuid;

    fn entry(customer: Uuid, target: AuditTarget, action: AuditAction) -> AuditEntry {
        AuditEntry::new(
            "ana@example.com",
            action,
            target,
            customer,
            json!({"category": "SaaS"}),
            json!({"category": "Hardware"}),
        )
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteAuditRepository::new(pool);
        let customer = Uuid::new_v4();
        let item = Uuid::new_v4();

        let first = entry(customer, AuditTarget::Classification(item), AuditAction::CategoryFeedback);
        let second = entry(customer, AuditTarget::Classification(item), AuditAction::Approve);
        repo.append(&first).await.unwrap();
        repo.append(&second).await.unwrap();
        repo.append(&entry(Uuid::new_v4(), AuditTarget::Classification(item), AuditAction::Approve))
            .await
            .unwrap();

        let listed = repo
            .list(AuditFilter {
                customer_id: Some(customer),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].after_json["category"], "Hardware");
    }

    #[tokio::test]
    async fn test_list_filters_by_target_and_action() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteAuditRepository::new(pool);
        let customer = Uuid::new_v4();
        let sub = Uuid::new_v4();

        repo.append(&entry(customer, AuditTarget::Subscription(sub), AuditAction::SetAudited))
            .await
            .unwrap();
        repo.append(&entry(customer, AuditTarget::Classification(sub), AuditAction::Reclassify))
            .await
            .unwrap();

        let by_target = repo
            .list(AuditFilter {
                target: Some(AuditTarget::Subscription(sub)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_target.len(), 1);
        assert_eq!(by_target[0].action, AuditAction::SetAudited);

        let by_action = repo
            .list(AuditFilter {
                action: Some(AuditAction::Reclassify),
                limit: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_action.len(), 1);
    }

    #[tokio::test]
    async fn test_entries_cannot_be_modified() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteAuditRepository::new(pool.clone());
        let e = entry(Uuid::new_v4(), AuditTarget::Classification(Uuid::new_v4()), AuditAction::Approve);
        repo.append(&e).await.unwrap();

        let update = sqlx::query("UPDATE audit_entries SET actor = 'mallory'")
            .execute(&pool)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM audit_entries").execute(&pool).await;
        assert!(delete.is_err());
    }
}
