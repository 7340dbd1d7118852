//! SQLite implementation of the CategoryRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CategoryCatalogEntry;
use crate::domain::ports::CategoryRepository;

#[derive(Clone)]
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn insert_if_absent(&self, entry: &CategoryCatalogEntry) -> DomainResult<bool> {
        let result = sqlx::query(
            r"INSERT INTO category_catalog (id, category_name, pattern_of_business_name, customer_id, active, created_at)
              VALUES (?, ?, ?, ?, ?, ?)
              ON CONFLICT DO NOTHING",
        )
        .bind(entry.id.to_string())
        .bind(&entry.category_name)
        .bind(&entry.pattern_of_business_name)
        .bind(entry.customer_id.map(|id| id.to_string()))
        .bind(entry.active)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, customer_id: Uuid, name: &str) -> DomainResult<Option<CategoryCatalogEntry>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r"SELECT id, category_name, pattern_of_business_name, customer_id, active, created_at
              FROM category_catalog
              WHERE category_name = ? AND active = 1 AND (customer_id = ? OR customer_id IS NULL)
              ORDER BY customer_id IS NULL
              LIMIT 1",
        )
        .bind(name)
        .bind(customer_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn rename(&self, customer_id: Uuid, old_name: &str, new_name: &str) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE category_catalog SET category_name = ? WHERE customer_id = ? AND category_name = ?",
        )
        .bind(new_name)
        .bind(customer_id.to_string())
        .bind(old_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> DomainResult<Vec<CategoryCatalogEntry>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"SELECT id, category_name, pattern_of_business_name, customer_id, active, created_at
              FROM category_catalog
              WHERE active = 1 AND (customer_id = ? OR customer_id IS NULL)
              ORDER BY category_name, customer_id IS NULL",
        )
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut entries: Vec<CategoryCatalogEntry> = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = CategoryCatalogEntry::try_from(row)?;
            // A customer entry shadows the global one with the same name.
            if entries.last().is_some_and(|prev| prev.category_name == entry.category_name) {
                continue;
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    category_name: String,
    pattern_of_business_name: Option<String>,
    customer_id: Option<String>,
    active: bool,
    created_at: String,
}

impl TryFrom<CategoryRow> for CategoryCatalogEntry {
    type Error = DomainError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(CategoryCatalogEntry {
            id: parse_uuid(&row.id)?,
            category_name: row.category_name,
            pattern_of_business_name: row.pattern_of_business_name,
            customer_id: parse_optional_uuid(row.customer_id)?,
            active: row.active,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteCategoryRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteCategoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_if_absent_treats_duplicate_as_noop() {
        let repo = setup().await;
        let customer = Uuid::new_v4();

        let first = CategoryCatalogEntry::for_customer(customer, "Usage Based");
        assert!(repo.insert_if_absent(&first).await.unwrap());

        let again = CategoryCatalogEntry::for_customer(customer, "Usage Based");
        assert!(!repo.insert_if_absent(&again).await.unwrap());

        // Same name for another customer is a different scope.
        let other = CategoryCatalogEntry::for_customer(Uuid::new_v4(), "Usage Based");
        assert!(repo.insert_if_absent(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_prefers_customer_entry_over_global() {
        let repo = setup().await;
        let customer = Uuid::new_v4();

        let global = repo.find(customer, "SaaS").await.unwrap().unwrap();
        assert!(global.is_global());

        let own = CategoryCatalogEntry::for_customer(customer, "SaaS").with_pattern_of_business("Custom");
        repo.insert_if_absent(&own).await.unwrap();

        let found = repo.find(customer, "SaaS").await.unwrap().unwrap();
        assert_eq!(found.customer_id, Some(customer));
        assert_eq!(found.pattern_of_business_name.as_deref(), Some("Custom"));

        assert!(repo.find(customer, "Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_only_touches_customer_rows() {
        let repo = setup().await;
        let customer = Uuid::new_v4();
        repo.insert_if_absent(&CategoryCatalogEntry::for_customer(customer, "Hybrid"))
            .await
            .unwrap();

        assert_eq!(repo.rename(customer, "Hybrid", "Blended").await.unwrap(), 1);
        assert!(repo.find(customer, "Blended").await.unwrap().is_some());

        // The global entry stays put.
        let hybrid = repo.find(customer, "Hybrid").await.unwrap().unwrap();
        assert!(hybrid.is_global());
        assert_eq!(repo.rename(customer, "Tech", "Technology").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_for_customer_dedupes_shadowed_globals() {
        let repo = setup().await;
        let customer = Uuid::new_v4();
        repo.insert_if_absent(&CategoryCatalogEntry::for_customer(customer, "SaaS"))
            .await
            .unwrap();
        repo.insert_if_absent(&CategoryCatalogEntry::for_customer(customer, "Usage Based"))
            .await
            .unwrap();

        let entries = repo.list_for_customer(customer).await.unwrap();
        assert_eq!(entries.len(), 12);
        let saas: Vec<_> = entries.iter().filter(|e| e.category_name == "SaaS").collect();
        assert_eq!(saas.len(), 1);
        assert_eq!(saas[0].customer_id, Some(customer));

        let other = repo.list_for_customer(Uuid::new_v4()).await.unwrap();
        assert_eq!(other.len(), 11);
    }
}
