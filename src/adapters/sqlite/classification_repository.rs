//! SQLite implementation of the ClassificationRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{parse_datetime, parse_json_or_default, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AmortizationTechnique, CategoryStats, ClassificationStatus, LineItemClassification,
    RevenueRecognitionTiming, HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD,
};
use crate::domain::ports::{CandidateQuery, ClassificationPatch, ClassificationRepository};

const COLUMNS: &str = "id, customer_id, product_name, rate_plan_name, charge_name, inferred_category, \
    inferred_pattern_of_business, confidence, status, rationale, conflict_flags, needs_review, \
    revenue_recognition_timing, amortization_technique, last_reviewed_by, last_reviewed_at, \
    created_at, updated_at";

/// Ids bound per `UPDATE`; SQLite caps bound parameters at 32766.
const MAX_IDS_PER_STATEMENT: usize = 10_000;

#[derive(Clone)]
pub struct SqliteClassificationRepository {
    pool: SqlitePool,
}

impl SqliteClassificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_with<'e, E>(executor: E, item: &LineItemClassification) -> DomainResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let flags_json = serde_json::to_string(&item.conflict_flags)?;

        sqlx::query(&format!(
            "INSERT INTO line_item_classifications ({COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(item.id.to_string())
        .bind(item.customer_id.to_string())
        .bind(&item.product_name)
        .bind(&item.rate_plan_name)
        .bind(&item.charge_name)
        .bind(&item.inferred_category)
        .bind(&item.inferred_pattern_of_business)
        .bind(item.confidence)
        .bind(item.status.as_str())
        .bind(&item.rationale)
        .bind(&flags_json)
        .bind(item.needs_review)
        .bind(item.revenue_recognition_timing.map(|t| t.as_str()))
        .bind(item.amortization_technique.map(|t| t.as_str()))
        .bind(&item.last_reviewed_by)
        .bind(item.last_reviewed_at.map(|t| t.to_rfc3339()))
        .bind(item.created_at.to_rfc3339())
        .bind(item.updated_at.to_rfc3339())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// `UPDATE ... SET` for the fields present in `patch`, without a WHERE clause.
    fn patch_statement(patch: &ClassificationPatch, updated_at: &str) -> QueryBuilder<'static, Sqlite> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE line_item_classifications SET updated_at = ");
        builder.push_bind(updated_at.to_string());

        if let Some(category) = &patch.category {
            builder.push(", inferred_category = ").push_bind(category.clone());
        }
        if let Some(pob) = &patch.pattern_of_business {
            builder.push(", inferred_pattern_of_business = ").push_bind(pob.clone());
        }
        if let Some(rationale) = &patch.rationale {
            builder.push(", rationale = ").push_bind(rationale.clone());
        }
        if let Some(confidence) = patch.confidence {
            builder.push(", confidence = ").push_bind(confidence);
        }
        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some((by, at)) = &patch.reviewed {
            builder
                .push(", last_reviewed_by = ")
                .push_bind(by.clone())
                .push(", last_reviewed_at = ")
                .push_bind(at.to_rfc3339());
        }
        builder
    }
}

#[async_trait]
impl ClassificationRepository for SqliteClassificationRepository {
    async fn insert(&self, item: &LineItemClassification) -> DomainResult<()> {
        Self::insert_with(&self.pool, item).await
    }

    async fn insert_many(&self, items: &[LineItemClassification]) -> DomainResult<u64> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            Self::insert_with(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(items.len() as u64)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<LineItemClassification>> {
        let row: Option<ClassificationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM line_item_classifications WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> DomainResult<Vec<LineItemClassification>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM line_item_classifications WHERE customer_id = "
        ));
        builder.push_bind(query.customer_id.to_string());

        if let Some(category) = &query.category {
            builder.push(" AND inferred_category = ").push_bind(category.clone());
        }
        if let Some(threshold) = query.confidence_below {
            builder.push(" AND confidence IS NOT NULL AND confidence < ").push_bind(threshold);
        }

        builder
            .push(" ORDER BY product_name, rate_plan_name, charge_name, id LIMIT ")
            .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows: Vec<ClassificationRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_many(&self, ids: &[Uuid], patch: &ClassificationPatch) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut rows_affected = 0;
        for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut builder = Self::patch_statement(patch, &updated_at);
            builder.push(" WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.to_string());
            }
            separated.push_unseparated(")");

            rows_affected += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(rows_affected)
    }

    async fn update(&self, item: &LineItemClassification) -> DomainResult<()> {
        let flags_json = serde_json::to_string(&item.conflict_flags)?;

        let result = sqlx::query(
            r"UPDATE line_item_classifications SET inferred_category = ?, inferred_pattern_of_business = ?,
               confidence = ?, status = ?, rationale = ?, conflict_flags = ?, needs_review = ?,
               revenue_recognition_timing = ?, amortization_technique = ?, last_reviewed_by = ?,
               last_reviewed_at = ?, updated_at = ?
               WHERE id = ?",
        )
        .bind(&item.inferred_category)
        .bind(&item.inferred_pattern_of_business)
        .bind(item.confidence)
        .bind(item.status.as_str())
        .bind(&item.rationale)
        .bind(&flags_json)
        .bind(item.needs_review)
        .bind(item.revenue_recognition_timing.map(|t| t.as_str()))
        .bind(item.amortization_technique.map(|t| t.as_str()))
        .bind(&item.last_reviewed_by)
        .bind(item.last_reviewed_at.map(|t| t.to_rfc3339()))
        .bind(item.updated_at.to_rfc3339())
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Line item", item.id));
        }

        Ok(())
    }

    async fn category_stats(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryStats>> {
        let customer = customer_id.to_string();
        let rows: Vec<CategoryStatsRow> = sqlx::query_as(
            r"SELECT c.inferred_category AS category,
                     COUNT(*) AS prpc_count,
                     COALESCE(MAX(s.subscription_count), 0) AS subscription_count,
                     AVG(c.confidence) AS avg_confidence,
                     COALESCE(SUM(CASE WHEN c.status = 'approved' THEN 1 ELSE 0 END), 0) AS approved_count,
                     COALESCE(SUM(c.needs_review), 0) AS needs_review_count,
                     COALESCE(SUM(CASE WHEN c.confidence < ? THEN 1 ELSE 0 END), 0) AS low_count,
                     COALESCE(SUM(CASE WHEN c.confidence >= ? AND c.confidence < ? THEN 1 ELSE 0 END), 0) AS medium_count,
                     COALESCE(SUM(CASE WHEN c.confidence >= ? THEN 1 ELSE 0 END), 0) AS high_count
              FROM line_item_classifications c
              LEFT JOIN (
                  SELECT c2.inferred_category AS category,
                         COUNT(DISTINCT sli.subscription_id) AS subscription_count
                  FROM subscription_line_items sli
                  JOIN line_item_classifications c2 ON c2.id = sli.classification_id
                  WHERE c2.customer_id = ?
                  GROUP BY c2.inferred_category
              ) s ON s.category = c.inferred_category
              WHERE c.customer_id = ?
              GROUP BY c.inferred_category
              ORDER BY prpc_count DESC, category",
        )
        .bind(LOW_CONFIDENCE_THRESHOLD)
        .bind(LOW_CONFIDENCE_THRESHOLD)
        .bind(HIGH_CONFIDENCE_THRESHOLD)
        .bind(HIGH_CONFIDENCE_THRESHOLD)
        .bind(&customer)
        .bind(&customer)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryStats::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ClassificationRow {
    id: String,
    customer_id: String,
    product_name: String,
    rate_plan_name: String,
    charge_name: String,
    inferred_category: String,
    inferred_pattern_of_business: Option<String>,
    confidence: Option<f64>,
    status: String,
    rationale: String,
    conflict_flags: Option<String>,
    needs_review: bool,
    revenue_recognition_timing: Option<String>,
    amortization_technique: Option<String>,
    last_reviewed_by: Option<String>,
    last_reviewed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ClassificationRow> for LineItemClassification {
    type Error = DomainError;

    fn try_from(row: ClassificationRow) -> Result<Self, Self::Error> {
        let status = ClassificationStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid status: {}", row.status)))?;

        let revenue_recognition_timing = row
            .revenue_recognition_timing
            .map(|s| {
                RevenueRecognitionTiming::from_str(&s)
                    .ok_or_else(|| DomainError::Serialization(format!("Invalid timing: {s}")))
            })
            .transpose()?;

        let amortization_technique = row
            .amortization_technique
            .map(|s| {
                AmortizationTechnique::from_str(&s)
                    .ok_or_else(|| DomainError::Serialization(format!("Invalid technique: {s}")))
            })
            .transpose()?;

        let conflict_flags: BTreeSet<String> = parse_json_or_default(row.conflict_flags)?;

        Ok(LineItemClassification {
            id: parse_uuid(&row.id)?,
            customer_id: parse_uuid(&row.customer_id)?,
            product_name: row.product_name,
            rate_plan_name: row.rate_plan_name,
            charge_name: row.charge_name,
            inferred_category: row.inferred_category,
            inferred_pattern_of_business: row.inferred_pattern_of_business,
            confidence: row.confidence,
            status,
            rationale: row.rationale,
            conflict_flags,
            needs_review: row.needs_review,
            revenue_recognition_timing,
            amortization_technique,
            last_reviewed_by: row.last_reviewed_by,
            last_reviewed_at: parse_optional_datetime(row.last_reviewed_at)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryStatsRow {
    category: String,
    prpc_count: i64,
    subscription_count: i64,
    avg_confidence: Option<f64>,
    approved_count: i64,
    needs_review_count: i64,
    low_count: i64,
    medium_count: i64,
    high_count: i64,
}

#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
impl From<CategoryStatsRow> for CategoryStats {
    fn from(row: CategoryStatsRow) -> Self {
        let approval_rate = if row.prpc_count > 0 {
            row.approved_count as f64 / row.prpc_count as f64
        } else {
            0.0
        };
        Self {
            category: row.category,
            prpc_count: row.prpc_count as u64,
            subscription_count: row.subscription_count as u64,
            avg_confidence: row.avg_confidence,
            approval_rate,
            needs_review_count: row.needs_review_count as u64,
            low_confidence_count: row.low_count as u64,
            medium_confidence_count: row.medium_count as u64,
            high_confidence_count: row.high_count as u64,
        }
    }
}
