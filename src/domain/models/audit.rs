//! Audit trail domain model.
//!
//! Audit entries are append-only. One is written for every mutating
//! operation on a classification, a subscription, or a category as a whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "snake_case")]
pub enum AuditTarget {
    Classification(Uuid),
    Subscription(Uuid),
    /// Category-wide operations (rename, merge), keyed by customer.
    CategoryOp(Uuid),
}

impl AuditTarget {
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Classification(_) => "prpc_inference",
            Self::Subscription(_) => "subscription",
            Self::CategoryOp(_) => "category",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::Classification(id) | Self::Subscription(id) | Self::CategoryOp(id) => *id,
        }
    }

    pub fn from_parts(entity_type: &str, entity_id: Uuid) -> Option<Self> {
        match entity_type {
            "prpc_inference" => Some(Self::Classification(entity_id)),
            "subscription" => Some(Self::Subscription(entity_id)),
            "category" => Some(Self::CategoryOp(entity_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CategoryFeedback,
    Reclassify,
    Approve,
    RenameCategory,
    MergeCategory,
    CorrectSubscription,
    SetAudited,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategoryFeedback => "category_feedback",
            Self::Reclassify => "reclassify",
            Self::Approve => "approve",
            Self::RenameCategory => "rename_category",
            Self::MergeCategory => "merge_category",
            Self::CorrectSubscription => "correct_subscription",
            Self::SetAudited => "set_audited",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "category_feedback" => Some(Self::CategoryFeedback),
            "reclassify" => Some(Self::Reclassify),
            "approve" => Some(Self::Approve),
            "rename_category" => Some(Self::RenameCategory),
            "merge_category" => Some(Self::MergeCategory),
            "correct_subscription" => Some(Self::CorrectSubscription),
            "set_audited" => Some(Self::SetAudited),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub target: AuditTarget,
    pub customer_id: Uuid,
    pub before_json: Value,
    pub after_json: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        target: AuditTarget,
        customer_id: Uuid,
        before_json: Value,
        after_json: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action,
            target,
            customer_id,
            before_json,
            after_json,
            created_at: Utc::now(),
        }
    }

    /// One-line summary for listings.
    pub fn summary(&self) -> String {
        match self.target {
            AuditTarget::Classification(id) => format!(
                "{} changed line item {}: {} -> {}",
                self.actor,
                id,
                self.before_json["category"].as_str().unwrap_or("?"),
                self.after_json["category"].as_str().unwrap_or("?"),
            ),
            AuditTarget::Subscription(id) => {
                format!("{} {} subscription {}", self.actor, self.action.as_str(), id)
            }
            AuditTarget::CategoryOp(_) => format!(
                "{} {} '{}' -> '{}' ({} line items)",
                self.actor,
                self.action.as_str(),
                self.before_json["from_category"].as_str().unwrap_or("?"),
                self.after_json["to_category"].as_str().unwrap_or("?"),
                self.after_json["prpc_count"].as_u64().unwrap_or(0),
            ),
        }
    }
}
