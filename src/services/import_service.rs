//! Workspace seeding from a JSON export of classified line items.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LineItemClassification, Subscription};
use crate::domain::ports::{ClassificationRepository, SubscriptionRepository};

/// One line item in an import file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineItemImport {
    pub product_name: String,
    pub rate_plan_name: String,
    pub charge_name: String,
    pub category: String,
    #[serde(default)]
    pub pattern_of_business: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub conflict_flags: BTreeSet<String>,
    /// Subscription numbers billing this line item.
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

impl LineItemImport {
    fn into_classification(self, customer_id: Uuid) -> LineItemClassification {
        let mut item = LineItemClassification::new(
            customer_id,
            self.product_name,
            self.rate_plan_name,
            self.charge_name,
            self.category,
        )
        .with_rationale(self.rationale);
        item.inferred_pattern_of_business = self.pattern_of_business;
        item.confidence = self.confidence;
        item.needs_review = !self.conflict_flags.is_empty();
        item.conflict_flags = self.conflict_flags;
        item
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub line_items: u64,
    pub subscriptions_created: usize,
    pub links: usize,
}

pub struct ImportService<C, S>
where
    C: ClassificationRepository,
    S: SubscriptionRepository,
{
    classifications: Arc<C>,
    subscriptions: Arc<S>,
}

impl<C, S> ImportService<C, S>
where
    C: ClassificationRepository,
    S: SubscriptionRepository,
{
    pub fn new(classifications: Arc<C>, subscriptions: Arc<S>) -> Self {
        Self {
            classifications,
            subscriptions,
        }
    }

    /// Parse and import a JSON array of line items.
    pub async fn import_json(&self, customer_id: Uuid, json: &str) -> DomainResult<ImportSummary> {
        let records: Vec<LineItemImport> = serde_json::from_str(json)
            .map_err(|e| DomainError::Validation(format!("Import file is not a line-item array: {e}")))?;
        self.import(customer_id, records).await
    }

    /// Every record is validated before anything is written.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn import(&self, customer_id: Uuid, records: Vec<LineItemImport>) -> DomainResult<ImportSummary> {
        let mut items = Vec::with_capacity(records.len());
        let mut billed_by = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let numbers = record.subscriptions.clone();
            let item = record.into_classification(customer_id);
            item.validate()
                .map_err(|reason| DomainError::Validation(format!("Record {index}: {reason}")))?;
            billed_by.push((item.id, numbers));
            items.push(item);
        }

        let line_items = self.classifications.insert_many(&items).await?;

        let mut known: HashMap<String, Uuid> = self
            .subscriptions
            .list_for_customer(customer_id)
            .await?
            .into_iter()
            .map(|s| (s.subscription_number, s.id))
            .collect();

        let mut summary = ImportSummary {
            line_items,
            ..ImportSummary::default()
        };
        for (item_id, numbers) in billed_by {
            for number in numbers.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                let subscription_id = match known.get(number) {
                    Some(id) => *id,
                    None => {
                        let subscription = Subscription::new(customer_id, number);
                        self.subscriptions.insert(&subscription).await?;
                        known.insert(number.to_string(), subscription.id);
                        summary.subscriptions_created += 1;
                        subscription.id
                    }
                };
                self.subscriptions.link_line_item(subscription_id, item_id).await?;
                summary.links += 1;
            }
        }

        info!(
            %customer_id,
            line_items = summary.line_items,
            subscriptions_created = summary.subscriptions_created,
            "workspace import finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteClassificationRepository, SqliteSubscriptionRepository,
    };
    use crate::domain::ports::CandidateQuery;

    async fn setup() -> (
        ImportService<SqliteClassificationRepository, SqliteSubscriptionRepository>,
        Arc<SqliteClassificationRepository>,
    ) {
        let pool = create_migrated_test_pool().await.unwrap();
        let classifications = Arc::new(SqliteClassificationRepository::new(pool.clone()));
        let subscriptions = Arc::new(SqliteSubscriptionRepository::new(pool));
        (ImportService::new(classifications.clone(), subscriptions), classifications)
    }

    const EXPORT: &str = r#"[
        {"product_name": "Server Pro", "rate_plan_name": "Annual", "charge_name": "Base",
         "category": "SaaS", "confidence": 0.2, "subscriptions": ["S-1", "S-2"]},
        {"product_name": "Seats", "rate_plan_name": "Monthly", "charge_name": "Per Seat",
         "category": "SaaS", "confidence": 0.9, "conflict_flags": ["pob_mismatch"],
         "subscriptions": ["S-1"]}
    ]"#;

    #[tokio::test]
    async fn test_import_creates_items_and_subscriptions() {
        let (service, classifications) = setup().await;
        let customer = Uuid::new_v4();

        let summary = service.import_json(customer, EXPORT).await.unwrap();
        assert_eq!(summary.line_items, 2);
        assert_eq!(summary.subscriptions_created, 2);
        assert_eq!(summary.links, 3);

        let stored = classifications
            .find_candidates(&CandidateQuery::for_customer(customer, 10))
            .await
            .unwrap();
        let seats = stored.iter().find(|i| i.product_name == "Seats").unwrap();
        assert!(seats.needs_review);

        let stats = classifications.category_stats(customer).await.unwrap();
        assert_eq!(stats[0].subscription_count, 2);
    }

    #[tokio::test]
    async fn test_second_import_reuses_subscriptions() {
        let (service, _) = setup().await;
        let customer = Uuid::new_v4();
        service.import_json(customer, EXPORT).await.unwrap();

        let summary = service.import_json(customer, EXPORT).await.unwrap();
        assert_eq!(summary.subscriptions_created, 0);
    }

    #[tokio::test]
    async fn test_invalid_record_aborts_before_writes() {
        let (service, classifications) = setup().await;
        let customer = Uuid::new_v4();
        let json = r#"[
            {"product_name": "Ok", "rate_plan_name": "P", "charge_name": "C", "category": "SaaS"},
            {"product_name": "Bad", "rate_plan_name": "P", "charge_name": "C", "category": "SaaS", "confidence": 3.0}
        ]"#;

        let err = service.import_json(customer, json).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("Record 1")));
        assert!(classifications
            .find_candidates(&CandidateQuery::for_customer(customer, 10))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_is_validation_error() {
        let (service, _) = setup().await;
        let err = service.import_json(Uuid::new_v4(), "{}").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
