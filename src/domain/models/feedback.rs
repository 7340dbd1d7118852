//! Feedback requests and the prompts built from them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::numbered_taxonomy;
use super::classification::LineItemClassification;

/// Maximum number of line items rendered into a classifier prompt.
pub const MAX_PROMPT_SAMPLE: usize = 100;

/// Free-text correction of a category, scoped to a customer's records.
/// Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub free_text: String,
    pub customer_id: Uuid,
    pub scope_category: Option<String>,
    #[serde(default)]
    pub low_confidence_only: bool,
}

impl FeedbackRequest {
    pub fn new(customer_id: Uuid, free_text: impl Into<String>) -> Self {
        Self {
            free_text: free_text.into(),
            customer_id,
            scope_category: None,
            low_confidence_only: false,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.scope_category = Some(category.into());
        self
    }

    pub fn low_confidence_only(mut self) -> Self {
        self.low_confidence_only = true;
        self
    }

    /// True when the whole reviewed slice should be updated without pattern
    /// filtering: a category scope restricted to its low-confidence records.
    pub fn targets_whole_slice(&self) -> bool {
        self.low_confidence_only && self.scope_category.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.free_text.trim().is_empty() {
            return Err("Feedback cannot be empty".to_string());
        }
        if let Some(category) = &self.scope_category {
            if category.trim().is_empty() {
                return Err("Scope category cannot be blank".to_string());
            }
        }
        if self.low_confidence_only && self.scope_category.is_none() {
            return Err("Select a category to limit feedback to its low-confidence items".to_string());
        }
        Ok(())
    }
}

/// Prompt for bulk category feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFeedbackPrompt {
    pub feedback: String,
    pub scope_category: Option<String>,
    /// At most [`MAX_PROMPT_SAMPLE`] lines of `"{product} - {ratePlan} - {charge}"`.
    pub sample_lines: Vec<String>,
}

impl CategoryFeedbackPrompt {
    pub fn build(request: &FeedbackRequest, candidates: &[LineItemClassification], sample_size: usize) -> Self {
        let limit = sample_size.min(MAX_PROMPT_SAMPLE);
        Self {
            feedback: request.free_text.trim().to_string(),
            scope_category: request.scope_category.clone(),
            sample_lines: candidates.iter().take(limit).map(LineItemClassification::display_line).collect(),
        }
    }

    pub fn system_message(&self) -> String {
        format!(
            "You are a revenue recognition analyst. Line items are classified into exactly one \
             of these categories:\n{}\n\nThe user is correcting existing classifications. \
             Decide which category the described line items belong to and give a short, \
             case-insensitive text pattern that identifies them by product, rate plan or \
             charge name. Respond only by calling the provided function.",
            numbered_taxonomy()
        )
    }

    pub fn user_message(&self) -> String {
        let scope = self
            .scope_category
            .as_deref()
            .map(|c| format!("Currently reviewing category: {c}\n"))
            .unwrap_or_default();
        format!(
            "{scope}Feedback: {}\n\nLine items (product - rate plan - charge):\n{}",
            self.feedback,
            self.sample_lines.join("\n")
        )
    }
}

/// Prompt for reclassifying a single line item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFeedbackPrompt {
    pub feedback: String,
    pub line: String,
    pub current_category: String,
    pub current_pob: Option<String>,
    pub current_rationale: String,
}

impl ItemFeedbackPrompt {
    pub fn build(item: &LineItemClassification, feedback: &str) -> Self {
        Self {
            feedback: feedback.trim().to_string(),
            line: item.display_line(),
            current_category: item.inferred_category.clone(),
            current_pob: item.inferred_pattern_of_business.clone(),
            current_rationale: item.rationale.clone(),
        }
    }

    pub fn system_message(&self) -> String {
        format!(
            "You are a revenue recognition analyst. Classify the line item into exactly one of \
             these categories:\n{}\n\nAlso give its pattern of business, when revenue is \
             recognized, how it is amortized, your rationale and a confidence between 0 and 1. \
             Respond only by calling the provided function.",
            numbered_taxonomy()
        )
    }

    pub fn user_message(&self) -> String {
        format!(
            "Line item: {}\nCurrent category: {}\nCurrent pattern of business: {}\n\
             Current rationale: {}\n\nReviewer feedback: {}",
            self.line,
            self.current_category,
            self.current_pob.as_deref().unwrap_or("none"),
            if self.current_rationale.is_empty() { "none" } else { &self.current_rationale },
            self.feedback
        )
    }
}
