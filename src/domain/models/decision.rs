//! Structured decisions returned by the external classifier.
//!
//! These are the payloads of the single forced tool call. Field names match
//! the JSON schema sent to the model, so they deserialize directly from the
//! tool-call arguments.

use serde::{Deserialize, Serialize};

/// When revenue for a line item is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevenueRecognitionTiming {
    #[serde(rename = "upon booking")]
    UponBooking,
    #[serde(rename = "upon billing")]
    UponBilling,
    #[serde(rename = "upon event")]
    UponEvent,
}

impl RevenueRecognitionTiming {
    pub const ALL: [Self; 3] = [Self::UponBooking, Self::UponBilling, Self::UponEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UponBooking => "upon booking",
            Self::UponBilling => "upon billing",
            Self::UponEvent => "upon event",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// How recognized revenue is spread over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortizationTechnique {
    #[serde(rename = "ratable over time")]
    RatableOverTime,
    #[serde(rename = "immediate")]
    Immediate,
}

impl AmortizationTechnique {
    pub const ALL: [Self; 2] = [Self::RatableOverTime, Self::Immediate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RatableOverTime => "ratable over time",
            Self::Immediate => "immediate",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Bulk category feedback result: move records matching a pattern to a new category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryChangeDecision {
    pub new_category: String,
    pub pattern_to_match: String,
    pub rationale: String,
}

impl CategoryChangeDecision {
    /// `pattern_to_match` may be blank here; the matcher treats a blank
    /// pattern as matching nothing.
    pub fn validate(&self) -> Result<(), String> {
        if self.new_category.trim().is_empty() {
            return Err("new_category is empty".to_string());
        }
        if self.rationale.trim().is_empty() {
            return Err("rationale is empty".to_string());
        }
        Ok(())
    }
}

/// Single-item reclassification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReclassification {
    pub category: String,
    pub pob: String,
    pub revenue_recognition_timing: RevenueRecognitionTiming,
    pub amortization_technique: AmortizationTechnique,
    pub rationale: String,
    pub confidence: f64,
}

impl ItemReclassification {
    pub fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category is empty".to_string());
        }
        if self.pob.trim().is_empty() {
            return Err("pob is empty".to_string());
        }
        if self.rationale.trim().is_empty() {
            return Err("rationale is empty".to_string());
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", self.confidence));
        }
        Ok(())
    }

    /// Cosmetic review points: the confidence as a whole percentage.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn xp_earned(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reclassification() -> ItemReclassification {
        ItemReclassification {
            category: "Hardware".to_string(),
            pob: "Point in time".to_string(),
            revenue_recognition_timing: RevenueRecognitionTiming::UponBooking,
            amortization_technique: AmortizationTechnique::Immediate,
            rationale: "Physical goods".to_string(),
            confidence: 0.87,
        }
    }

    #[test]
    fn test_timing_parses_wire_values() {
        let timing: RevenueRecognitionTiming = serde_json::from_str("\"upon event\"").unwrap();
        assert_eq!(timing, RevenueRecognitionTiming::UponEvent);
        assert!(serde_json::from_str::<RevenueRecognitionTiming>("\"eventually\"").is_err());
        assert_eq!(
            RevenueRecognitionTiming::from_str("upon billing"),
            Some(RevenueRecognitionTiming::UponBilling)
        );
    }

    #[test]
    fn test_technique_parses_wire_values() {
        let technique: AmortizationTechnique =
            serde_json::from_str("\"ratable over time\"").unwrap();
        assert_eq!(technique, AmortizationTechnique::RatableOverTime);
        assert!(serde_json::from_str::<AmortizationTechnique>("\"straight line\"").is_err());
    }

    #[test]
    fn test_category_decision_missing_rationale_fails_to_parse() {
        let raw = r#"{"new_category": "Hardware", "pattern_to_match": "server"}"#;
        assert!(serde_json::from_str::<CategoryChangeDecision>(raw).is_err());
    }

    #[test]
    fn test_category_decision_validate() {
        let decision = CategoryChangeDecision {
            new_category: "  ".to_string(),
            pattern_to_match: "server".to_string(),
            rationale: "r".to_string(),
        };
        assert!(decision.validate().is_err());
    }

    #[test]
    fn test_reclassification_confidence_bounds() {
        let mut r = reclassification();
        assert!(r.validate().is_ok());
        r.confidence = 1.01;
        assert!(r.validate().is_err());
        r.confidence = -0.1;
        assert!(r.validate().is_err());
        r.confidence = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_xp_earned_rounds_confidence() {
        assert_eq!(reclassification().xp_earned(), 87);
        let mut r = reclassification();
        r.confidence = 0.555;
        assert_eq!(r.xp_earned(), 56);
        r.confidence = 1.0;
        assert_eq!(r.xp_earned(), 100);
    }
}
