//! Line-item classification domain model.
//!
//! A classification is the inferred revenue-recognition category of one
//! PRPC (product / rate plan / charge triple) belonging to a customer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::decision::{AmortizationTechnique, RevenueRecognitionTiming};

/// Confidence below which a record counts as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Confidence at or above which a record counts as high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Review status of a classification.
///
/// Records start as `Inferred` (or `Processing` while the classifier is still
/// working on them) and move forward to `UserAdjusted` or `Approved`. Nothing
/// moves a record back to `Inferred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    #[default]
    Inferred,
    UserAdjusted,
    Approved,
    Processing,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inferred => "inferred",
            Self::UserAdjusted => "user_adjusted",
            Self::Approved => "approved",
            Self::Processing => "processing",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inferred" => Some(Self::Inferred),
            "user_adjusted" => Some(Self::UserAdjusted),
            "approved" => Some(Self::Approved),
            "processing" => Some(Self::Processing),
            _ => None,
        }
    }

    /// Check if this status can move to another status.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        if new_status == Self::Inferred {
            return false;
        }
        matches!(
            (self, new_status),
            (Self::Processing, _)
                | (Self::Inferred, Self::UserAdjusted | Self::Approved)
                | (Self::UserAdjusted, Self::UserAdjusted | Self::Approved)
                | (Self::Approved, Self::UserAdjusted | Self::Approved)
        )
    }
}

/// Coarse confidence bucket used by the category summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < LOW_CONFIDENCE_THRESHOLD {
            Self::Low
        } else if confidence < HIGH_CONFIDENCE_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Classification of a single billable line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemClassification {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_name: String,
    pub rate_plan_name: String,
    pub charge_name: String,
    pub inferred_category: String,
    pub inferred_pattern_of_business: Option<String>,
    /// Classifier certainty in [0, 1].
    pub confidence: Option<f64>,
    pub status: ClassificationStatus,
    pub rationale: String,
    pub conflict_flags: BTreeSet<String>,
    pub needs_review: bool,
    pub revenue_recognition_timing: Option<RevenueRecognitionTiming>,
    pub amortization_technique: Option<AmortizationTechnique>,
    pub last_reviewed_by: Option<String>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineItemClassification {
    pub fn new(
        customer_id: Uuid,
        product_name: impl Into<String>,
        rate_plan_name: impl Into<String>,
        charge_name: impl Into<String>,
        inferred_category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            product_name: product_name.into(),
            rate_plan_name: rate_plan_name.into(),
            charge_name: charge_name.into(),
            inferred_category: inferred_category.into(),
            inferred_pattern_of_business: None,
            confidence: None,
            status: ClassificationStatus::Inferred,
            rationale: String::new(),
            conflict_flags: BTreeSet::new(),
            needs_review: false,
            revenue_recognition_timing: None,
            amortization_technique: None,
            last_reviewed_by: None,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_pattern_of_business(mut self, pob: impl Into<String>) -> Self {
        self.inferred_pattern_of_business = Some(pob.into());
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_conflict_flag(mut self, flag: impl Into<String>) -> Self {
        self.conflict_flags.insert(flag.into());
        self.needs_review = true;
        self
    }

    /// `"{product} - {ratePlan} - {charge}"`, the line format sent to the classifier.
    pub fn display_line(&self) -> String {
        format!(
            "{} - {} - {}",
            self.product_name, self.rate_plan_name, self.charge_name
        )
    }

    /// True when product, rate-plan and charge names, joined without a
    /// separator, contain `needle`. `needle` must already be lowercased.
    pub fn names_contain(&self, needle: &str) -> bool {
        format!("{}{}{}", self.product_name, self.rate_plan_name, self.charge_name)
            .to_lowercase()
            .contains(needle)
    }

    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.confidence.is_some_and(|c| c < threshold)
    }

    /// State captured in audit entries before and after a change.
    pub fn audit_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "category": self.inferred_category,
            "pob": self.inferred_pattern_of_business,
            "status": self.status.as_str(),
            "confidence": self.confidence,
            "rationale": self.rationale,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.product_name.trim().is_empty() {
            return Err("Product name cannot be empty".to_string());
        }
        if self.inferred_category.trim().is_empty() {
            return Err("Category cannot be empty".to_string());
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("Confidence {c} is outside [0, 1]"));
            }
        }
        Ok(())
    }
}
