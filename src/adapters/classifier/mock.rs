//! Scripted classifier for tests.
//!
//! Returns queued responses in order and counts calls, so tests can assert
//! both what the pipeline did with a decision and whether the classifier
//! was reached at all.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CategoryChangeDecision, CategoryFeedbackPrompt, ItemFeedbackPrompt, ItemReclassification,
};
use crate::domain::ports::Classifier;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    CategoryChange(CategoryChangeDecision),
    Reclassification(ItemReclassification),
    Unavailable(String),
    ContractViolation(String),
}

impl ScriptedResponse {
    pub fn category_change(
        new_category: impl Into<String>,
        pattern_to_match: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self::CategoryChange(CategoryChangeDecision {
            new_category: new_category.into(),
            pattern_to_match: pattern_to_match.into(),
            rationale: rationale.into(),
        })
    }

    fn into_error(self) -> DomainError {
        match self {
            Self::Unavailable(message) => DomainError::ClassifierUnavailable(message),
            Self::ContractViolation(reason) => DomainError::contract_violation(reason, ""),
            other => DomainError::contract_violation(
                format!("scripted response does not fit this call: {other:?}"),
                "",
            ),
        }
    }
}

/// Classifier double that replays a script.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
    last_category_prompt: Mutex<Option<CategoryFeedbackPrompt>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Shared handle, for wiring into services while keeping access to the counters.
    pub fn shared(responses: impl IntoIterator<Item = ScriptedResponse>) -> Arc<Self> {
        Arc::new(Self::with_responses(responses))
    }

    pub async fn push(&self, response: ScriptedResponse) {
        self.script.lock().await.push_back(response);
    }

    /// Number of classifier calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent bulk-feedback prompt received.
    pub async fn last_category_prompt(&self) -> Option<CategoryFeedbackPrompt> {
        self.last_category_prompt.lock().await.clone()
    }

    async fn next(&self) -> DomainResult<ScriptedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| DomainError::ClassifierUnavailable("script exhausted".to_string()))
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn propose_category_change(&self, prompt: &CategoryFeedbackPrompt) -> DomainResult<CategoryChangeDecision> {
        *self.last_category_prompt.lock().await = Some(prompt.clone());
        match self.next().await? {
            ScriptedResponse::CategoryChange(decision) => {
                decision
                    .validate()
                    .map_err(|reason| DomainError::contract_violation(reason, ""))?;
                Ok(decision)
            }
            other => Err(other.into_error()),
        }
    }

    async fn reclassify_item(&self, _prompt: &ItemFeedbackPrompt) -> DomainResult<ItemReclassification> {
        match self.next().await? {
            ScriptedResponse::Reclassification(decision) => {
                decision
                    .validate()
                    .map_err(|reason| DomainError::contract_violation(reason, ""))?;
                Ok(decision)
            }
            other => Err(other.into_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> CategoryFeedbackPrompt {
        CategoryFeedbackPrompt {
            feedback: "servers are hardware".to_string(),
            scope_category: None,
            sample_lines: vec!["Server Pro - Annual - Base".to_string()],
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_and_counts() {
        let classifier = ScriptedClassifier::with_responses([
            ScriptedResponse::category_change("Hardware", "server", "physical"),
            ScriptedResponse::Unavailable("HTTP 500".to_string()),
        ]);

        let first = classifier.propose_category_change(&prompt()).await.unwrap();
        assert_eq!(first.new_category, "Hardware");

        let second = classifier.propose_category_change(&prompt()).await.unwrap_err();
        assert!(matches!(second, DomainError::ClassifierUnavailable(_)));

        assert_eq!(classifier.call_count(), 2);
        assert_eq!(
            classifier.last_category_prompt().await.unwrap().sample_lines,
            vec!["Server Pro - Annual - Base".to_string()]
        );
    }

    #[tokio::test]
    async fn test_scripted_decisions_are_validated() {
        let classifier =
            ScriptedClassifier::with_responses([ScriptedResponse::category_change("Hardware", "server", "")]);
        let err = classifier.propose_category_change(&prompt()).await.unwrap_err();
        assert!(matches!(err, DomainError::ClassifierContractViolation { .. }));
    }
}
