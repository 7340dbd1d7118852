//! Subscription domain model.
//!
//! Subscriptions carry the billing attributes derived for a customer's
//! contracts. Analysts correct them by hand and mark them as audited; they
//! are never deleted here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
    MultiYear,
    OneTime,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
            Self::MultiYear => "multi_year",
            Self::OneTime => "one_time",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "semi_annual" => Some(Self::SemiAnnual),
            "annual" => Some(Self::Annual),
            "multi_year" => Some(Self::MultiYear),
            "one_time" => Some(Self::OneTime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Pending,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Justification per attribute name, e.g. `"termed" -> "term end date present"`.
pub type DerivationTrace = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Identifier in the billing system.
    pub subscription_number: String,
    pub termed: bool,
    pub evergreen: bool,
    pub has_cancellation: bool,
    pub has_ramp: bool,
    pub has_discount: bool,
    pub billing_period: BillingPeriod,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub confidence: Option<f64>,
    pub conflict_flags: BTreeSet<String>,
    pub audited: bool,
    pub derivation_trace: DerivationTrace,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(customer_id: Uuid, subscription_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            subscription_number: subscription_number.into(),
            termed: false,
            evergreen: false,
            has_cancellation: false,
            has_ramp: false,
            has_discount: false,
            billing_period: BillingPeriod::default(),
            currency: "USD".to_string(),
            status: SubscriptionStatus::default(),
            confidence: None,
            conflict_flags: BTreeSet::new(),
            audited: false,
            derivation_trace: DerivationTrace::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Billing attributes as captured in audit entries.
    pub fn attributes_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "termed": self.termed,
            "evergreen": self.evergreen,
            "has_cancellation": self.has_cancellation,
            "has_ramp": self.has_ramp,
            "has_discount": self.has_discount,
            "billing_period": self.billing_period.as_str(),
            "currency": self.currency,
            "status": self.status.as_str(),
            "audited": self.audited,
        })
    }

    /// Apply a manual correction. Returns the names of the attributes that
    /// actually changed; each gets a derivation-trace note naming the actor.
    pub fn apply_correction(&mut self, patch: &SubscriptionPatch, actor: &str) -> Vec<&'static str> {
        let mut changed = Vec::new();

        set_if_changed(&mut self.termed, patch.termed.as_ref(), "termed", &mut changed);
        set_if_changed(&mut self.evergreen, patch.evergreen.as_ref(), "evergreen", &mut changed);
        set_if_changed(
            &mut self.has_cancellation,
            patch.has_cancellation.as_ref(),
            "has_cancellation",
            &mut changed,
        );
        set_if_changed(&mut self.has_ramp, patch.has_ramp.as_ref(), "has_ramp", &mut changed);
        set_if_changed(&mut self.has_discount, patch.has_discount.as_ref(), "has_discount", &mut changed);
        set_if_changed(
            &mut self.billing_period,
            patch.billing_period.as_ref(),
            "billing_period",
            &mut changed,
        );
        set_if_changed(&mut self.currency, patch.currency.as_ref(), "currency", &mut changed);
        set_if_changed(&mut self.status, patch.status.as_ref(), "status", &mut changed);

        for attribute in &changed {
            self.derivation_trace
                .insert((*attribute).to_string(), format!("manually corrected by {actor}"));
        }
        if !changed.is_empty() {
            self.updated_at = Utc::now();
        }
        changed
    }
}

fn set_if_changed<T: PartialEq + Clone>(
    field: &mut T,
    value: Option<&T>,
    name: &'static str,
    changed: &mut Vec<&'static str>,
) {
    if let Some(value) = value {
        if field != value {
            *field = value.clone();
            changed.push(name);
        }
    }
}

/// Manual correction of subscription attributes. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    pub termed: Option<bool>,
    pub evergreen: Option<bool>,
    pub has_cancellation: Option<bool>,
    pub has_ramp: Option<bool>,
    pub has_discount: Option<bool>,
    pub billing_period: Option<BillingPeriod>,
    pub currency: Option<String>,
    pub status: Option<SubscriptionStatus>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
