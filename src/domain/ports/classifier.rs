//! External classifier port.
//!
//! The model behind this trait is an opaque black box. Implementations make
//! exactly one request per call, force a single structured tool call, and
//! return either a validated decision or an error:
//! - `ClassifierUnavailable` for transport or non-2xx failures
//! - `ClassifierContractViolation` for a missing or malformed tool call
//!
//! Implementations never write to storage.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CategoryChangeDecision, CategoryFeedbackPrompt, ItemFeedbackPrompt, ItemReclassification,
};

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Turn bulk category feedback into a category change and a match pattern.
    async fn propose_category_change(
        &self,
        prompt: &CategoryFeedbackPrompt,
    ) -> DomainResult<CategoryChangeDecision>;

    /// Reclassify one line item from reviewer feedback.
    async fn reclassify_item(&self, prompt: &ItemFeedbackPrompt) -> DomainResult<ItemReclassification>;
}
