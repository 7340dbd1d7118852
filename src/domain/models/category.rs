//! Category catalog and per-category statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed category vocabulary offered to the classifier.
pub const CATEGORY_TAXONOMY: [&str; 11] = [
    "SaaS",
    "Hardware",
    "Hardware One Time",
    "Tech",
    "Hybrid",
    "Services",
    "Consulting",
    "Support",
    "Training",
    "Tiered",
    "Freemium",
];

/// Numbered vocabulary as it appears in classifier prompts.
pub fn numbered_taxonomy() -> String {
    CATEGORY_TAXONOMY
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A category known to the catalog.
///
/// Entries with no `customer_id` are global and visible to every customer.
/// Classifications refer to entries by name, so renaming an entry means
/// rewriting every classification that uses the old name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCatalogEntry {
    pub id: Uuid,
    pub category_name: String,
    pub pattern_of_business_name: Option<String>,
    pub customer_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CategoryCatalogEntry {
    pub fn for_customer(customer_id: Uuid, category_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_name: category_name.into(),
            pattern_of_business_name: None,
            customer_id: Some(customer_id),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn global(category_name: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            ..Self::for_customer(Uuid::nil(), category_name)
        }
    }

    pub fn with_pattern_of_business(mut self, pob: impl Into<String>) -> Self {
        self.pattern_of_business_name = Some(pob.into());
        self
    }

    pub fn is_global(&self) -> bool {
        self.customer_id.is_none()
    }
}

/// Aggregated view of one category for a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub prpc_count: u64,
    pub subscription_count: u64,
    pub avg_confidence: Option<f64>,
    /// Approved records divided by `prpc_count`.
    pub approval_rate: f64,
    pub needs_review_count: u64,
    pub low_confidence_count: u64,
    pub medium_confidence_count: u64,
    pub high_confidence_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_taxonomy() {
        let text = numbered_taxonomy();
        assert!(text.starts_with("1. SaaS\n2. Hardware\n"));
        assert!(text.ends_with("11. Freemium"));
    }

    #[test]
    fn test_global_entry_has_no_customer() {
        let entry = CategoryCatalogEntry::global("SaaS");
        assert!(entry.is_global());
        let entry = CategoryCatalogEntry::for_customer(Uuid::new_v4(), "SaaS");
        assert!(!entry.is_global());
    }
}
