//! SQLite implementation of the SubscriptionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{parse_datetime, parse_json_or_default, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BillingPeriod, DerivationTrace, Subscription, SubscriptionStatus};
use crate::domain::ports::SubscriptionRepository;

const COLUMNS: &str = "id, customer_id, subscription_number, termed, evergreen, has_cancellation, has_ramp, \
    has_discount, billing_period, currency, status, confidence, conflict_flags, audited, derivation_trace, \
    created_at, updated_at";

#[derive(Clone)]
pub struct SqliteSubscriptionRepository {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> DomainResult<()> {
        sqlx::query(&format!(
            "INSERT INTO subscriptions ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(subscription.id.to_string())
        .bind(subscription.customer_id.to_string())
        .bind(&subscription.subscription_number)
        .bind(subscription.termed)
        .bind(subscription.evergreen)
        .bind(subscription.has_cancellation)
        .bind(subscription.has_ramp)
        .bind(subscription.has_discount)
        .bind(subscription.billing_period.as_str())
        .bind(&subscription.currency)
        .bind(subscription.status.as_str())
        .bind(subscription.confidence)
        .bind(serde_json::to_string(&subscription.conflict_flags)?)
        .bind(subscription.audited)
        .bind(serde_json::to_string(&subscription.derivation_trace)?)
        .bind(subscription.created_at.to_rfc3339())
        .bind(subscription.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Subscription>> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM subscriptions WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, subscription: &Subscription) -> DomainResult<()> {
        let result = sqlx::query(
            r"UPDATE subscriptions SET termed = ?, evergreen = ?, has_cancellation = ?, has_ramp = ?,
               has_discount = ?, billing_period = ?, currency = ?, status = ?, confidence = ?,
               conflict_flags = ?, audited = ?, derivation_trace = ?, updated_at = ?
               WHERE id = ?",
        )
        .bind(subscription.termed)
        .bind(subscription.evergreen)
        .bind(subscription.has_cancellation)
        .bind(subscription.has_ramp)
        .bind(subscription.has_discount)
        .bind(subscription.billing_period.as_str())
        .bind(&subscription.currency)
        .bind(subscription.status.as_str())
        .bind(subscription.confidence)
        .bind(serde_json::to_string(&subscription.conflict_flags)?)
        .bind(subscription.audited)
        .bind(serde_json::to_string(&subscription.derivation_trace)?)
        .bind(subscription.updated_at.to_rfc3339())
        .bind(subscription.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Subscription", subscription.id));
        }

        Ok(())
    }

    async fn link_line_item(&self, subscription_id: Uuid, classification_id: Uuid) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO subscription_line_items (subscription_id, classification_id) VALUES (?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(subscription_id.to_string())
        .bind(classification_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> DomainResult<Vec<Subscription>> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE customer_id = ? ORDER BY subscription_number"
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    customer_id: String,
    subscription_number: String,
    termed: bool,
    evergreen: bool,
    has_cancellation: bool,
    has_ramp: bool,
    has_discount: bool,
    billing_period: String,
    currency: String,
    status: String,
    confidence: Option<f64>,
    conflict_flags: Option<String>,
    audited: bool,
    derivation_trace: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let billing_period = BillingPeriod::from_str(&row.billing_period).ok_or_else(|| {
            DomainError::Serialization(format!("Invalid billing period: {}", row.billing_period))
        })?;
        let status = SubscriptionStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid subscription status: {}", row.status)))?;
        let conflict_flags: BTreeSet<String> = parse_json_or_default(row.conflict_flags)?;
        let derivation_trace: DerivationTrace = parse_json_or_default(row.derivation_trace)?;

        Ok(Subscription {
            id: parse_uuid(&row.id)?,
            customer_id: parse_uuid(&row.customer_id)?,
            subscription_number: row.subscription_number,
            termed: row.termed,
            evergreen: row.evergreen,
            has_cancellation: row.has_cancellation,
            has_ramp: row.has_ramp,
            has_discount: row.has_discount,
            billing_period,
            currency: row.currency,
            status,
            confidence: row.confidence,
            conflict_flags,
            audited: row.audited,
            derivation_trace,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteClassificationRepository};
    use crate::domain::models::{LineItemClassification, SubscriptionPatch};
    use crate::domain::ports::ClassificationRepository;

    #[tokio::test]
    async fn test_insert_get_update() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteSubscriptionRepository::new(pool);
        let mut sub = Subscription::new(Uuid::new_v4(), "A-S0001");
        repo.insert(&sub).await.unwrap();

        let patch = SubscriptionPatch {
            evergreen: Some(true),
            billing_period: Some(BillingPeriod::Quarterly),
            ..Default::default()
        };
        sub.apply_correction(&patch, "ana");
        sub.audited = true;
        repo.update(&sub).await.unwrap();

        let loaded = repo.get(sub.id).await.unwrap().unwrap();
        assert!(loaded.evergreen);
        assert!(loaded.audited);
        assert_eq!(loaded.billing_period, BillingPeriod::Quarterly);
        assert_eq!(
            loaded.derivation_trace.get("evergreen").map(String::as_str),
            Some("manually corrected by ana")
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteSubscriptionRepository::new(pool);
        let err = repo.update(&Subscription::new(Uuid::new_v4(), "X")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_linked_line_items_feed_category_stats() {
        let pool = create_migrated_test_pool().await.unwrap();
        let subs = SqliteSubscriptionRepository::new(pool.clone());
        let items = SqliteClassificationRepository::new(pool);
        let customer = Uuid::new_v4();

        let a = LineItemClassification::new(customer, "A", "P", "C", "SaaS");
        let b = LineItemClassification::new(customer, "B", "P", "C", "SaaS");
        items.insert_many(&[a.clone(), b.clone()]).await.unwrap();

        let s1 = Subscription::new(customer, "S-1");
        let s2 = Subscription::new(customer, "S-2");
        subs.insert(&s1).await.unwrap();
        subs.insert(&s2).await.unwrap();
        subs.link_line_item(s1.id, a.id).await.unwrap();
        subs.link_line_item(s1.id, b.id).await.unwrap();
        subs.link_line_item(s2.id, a.id).await.unwrap();
        subs.link_line_item(s2.id, a.id).await.unwrap();

        let stats = items.category_stats(customer).await.unwrap();
        assert_eq!(stats[0].subscription_count, 2);

        let listed = subs.list_for_customer(customer).await.unwrap();
        let numbers: Vec<_> = listed.iter().map(|s| s.subscription_number.as_str()).collect();
        assert_eq!(numbers, vec!["S-1", "S-2"]);
    }
}
