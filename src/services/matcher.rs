//! Classification matcher.
//!
//! Turns a feedback request plus the classifier's `pattern_to_match` into the
//! exact set of records a bulk update will touch.

use uuid::Uuid;

use crate::domain::models::{FeedbackRequest, LineItemClassification, MatchingConfig};
use crate::domain::ports::CandidateQuery;

/// Matched record ids, sorted, plus their count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub ids: Vec<Uuid>,
    pub count: usize,
}

impl MatchResult {
    fn from_ids(mut ids: Vec<Uuid>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let count = ids.len();
        Self { ids, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationMatcher {
    config: MatchingConfig,
}

impl ClassificationMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Candidate selection for a request, capped at `candidate_cap`.
    pub fn candidate_query(&self, request: &FeedbackRequest) -> CandidateQuery {
        CandidateQuery {
            customer_id: request.customer_id,
            category: request.scope_category.clone(),
            confidence_below: request
                .low_confidence_only
                .then_some(self.config.low_confidence_threshold),
            limit: self.config.candidate_cap,
        }
    }

    /// Resolve the records to update.
    ///
    /// A low-confidence request scoped to a category takes the whole reviewed
    /// slice and ignores the pattern. Everything else is pattern matched.
    pub fn select(
        &self,
        request: &FeedbackRequest,
        candidates: &[LineItemClassification],
        pattern: &str,
    ) -> MatchResult {
        match (&request.scope_category, request.targets_whole_slice()) {
            (Some(category), true) => Self::match_category(candidates, category),
            _ => Self::match_pattern(candidates, pattern),
        }
    }

    /// Records in `category`.
    pub fn match_category(candidates: &[LineItemClassification], category: &str) -> MatchResult {
        MatchResult::from_ids(
            candidates
                .iter()
                .filter(|c| c.inferred_category == category)
                .map(|c| c.id)
                .collect(),
        )
    }

    /// Records whose joined product, rate-plan and charge names contain the
    /// trimmed `pattern`, case-insensitively. A blank pattern matches nothing.
    pub fn match_pattern(candidates: &[LineItemClassification], pattern: &str) -> MatchResult {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return MatchResult::default();
        }

        MatchResult::from_ids(
            candidates
                .iter()
                .filter(|c| c.names_contain(&needle))
                .map(|c| c.id)
                .collect(),
        )
    }
}
