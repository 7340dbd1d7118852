//! Feedback-driven reclassification.
//!
//! Bulk flow: validate, fetch candidates, one classifier call, match, apply.
//! Single-item flow: validate, load, one classifier call, apply with a
//! reviewer stamp. Nothing is retried; validation failures never reach the
//! classifier.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::matcher::ClassificationMatcher;
use super::update_applier::{stamp_reviewer, UpdateApplier};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AuditAction, CategoryFeedbackPrompt, ClassificationStatus, FeedbackRequest, ItemFeedbackPrompt,
    LineItemClassification, MatchingConfig,
};
use crate::domain::ports::{AuditRepository, CategoryRepository, ClassificationRepository, Classifier};

/// Result of `submit_category_feedback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFeedbackOutcome {
    pub updated_count: u64,
    pub new_category: String,
    pub rationale: String,
    pub pattern_to_match: String,
    /// Records considered before matching.
    pub candidate_count: usize,
}

/// Result of `reclassify_single_item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassificationOutcome {
    pub classification: LineItemClassification,
    pub xp_earned: u32,
}

pub struct FeedbackService<C, K, A>
where
    C: ClassificationRepository,
    K: CategoryRepository,
    A: AuditRepository,
{
    classifications: Arc<C>,
    classifier: Arc<dyn Classifier>,
    applier: UpdateApplier<C, K, A>,
    matcher: ClassificationMatcher,
    sample_size: usize,
}

impl<C, K, A> FeedbackService<C, K, A>
where
    C: ClassificationRepository,
    K: CategoryRepository,
    A: AuditRepository,
{
    pub fn new(
        classifications: Arc<C>,
        categories: Arc<K>,
        audit: Arc<A>,
        classifier: Arc<dyn Classifier>,
        matching: MatchingConfig,
        sample_size: usize,
    ) -> Self {
        Self {
            applier: UpdateApplier::new(classifications.clone(), categories, audit),
            classifications,
            classifier,
            matcher: ClassificationMatcher::new(matching),
            sample_size,
        }
    }

    /// Turn free-text feedback into a category change across matching records.
    #[instrument(
        skip(self, request, actor),
        fields(
            customer_id = %request.customer_id,
            scope = ?request.scope_category,
            low_confidence_only = request.low_confidence_only,
            classifier = self.classifier.name()
        )
    )]
    pub async fn submit_category_feedback(
        &self,
        request: &FeedbackRequest,
        actor: &str,
    ) -> DomainResult<CategoryFeedbackOutcome> {
        request.validate().map_err(DomainError::Validation)?;
        require_actor(actor)?;

        let candidates = self
            .classifications
            .find_candidates(&self.matcher.candidate_query(request))
            .await?;
        if candidates.is_empty() {
            return Err(DomainError::Validation(
                "No line items are in the selected scope".to_string(),
            ));
        }

        let prompt = CategoryFeedbackPrompt::build(request, &candidates, self.sample_size);
        let decision = self
            .classifier
            .propose_category_change(&prompt)
            .await
            .inspect_err(|e| warn!(error = %e, kind = e.kind(), "classifier call failed"))?;

        let matched = self.matcher.select(request, &candidates, &decision.pattern_to_match);
        let matched_ids: HashSet<Uuid> = matched.ids.iter().copied().collect();
        let matched_items: Vec<LineItemClassification> = candidates
            .iter()
            .filter(|c| matched_ids.contains(&c.id))
            .cloned()
            .collect();

        let updated_count = self
            .applier
            .apply_bulk(
                request.customer_id,
                actor,
                &matched_items,
                &decision.new_category,
                &decision.rationale,
            )
            .await
            .inspect_err(|e| warn!(error = %e, kind = e.kind(), "bulk update failed"))?;

        info!(
            candidates = candidates.len(),
            matched = matched.count,
            updated = updated_count,
            new_category = %decision.new_category,
            pattern = %decision.pattern_to_match,
            "category feedback applied"
        );

        Ok(CategoryFeedbackOutcome {
            updated_count,
            new_category: decision.new_category,
            rationale: decision.rationale,
            pattern_to_match: decision.pattern_to_match,
            candidate_count: candidates.len(),
        })
    }

    /// Reclassify one record from reviewer feedback.
    #[instrument(skip(self, feedback, actor), fields(classifier = self.classifier.name()))]
    pub async fn reclassify_single_item(
        &self,
        inference_id: Uuid,
        feedback: &str,
        actor: &str,
    ) -> DomainResult<ReclassificationOutcome> {
        if feedback.trim().is_empty() {
            return Err(DomainError::Validation("Feedback cannot be empty".to_string()));
        }
        require_actor(actor)?;

        let before = self.load(inference_id).await?;
        let prompt = ItemFeedbackPrompt::build(&before, feedback);
        let decision = self
            .classifier
            .reclassify_item(&prompt)
            .await
            .inspect_err(|e| warn!(error = %e, kind = e.kind(), "classifier call failed"))?;

        let mut after = before.clone();
        after.inferred_category.clone_from(&decision.category);
        after.inferred_pattern_of_business = Some(decision.pob.clone());
        after.rationale.clone_from(&decision.rationale);
        after.confidence = Some(decision.confidence);
        after.revenue_recognition_timing = Some(decision.revenue_recognition_timing);
        after.amortization_technique = Some(decision.amortization_technique);
        after.status = ClassificationStatus::UserAdjusted;
        stamp_reviewer(&mut after, actor);

        self.applier
            .ensure_category(after.customer_id, &after.inferred_category)
            .await?;
        self.applier
            .apply_item(actor, AuditAction::Reclassify, &before, &after)
            .await?;

        info!(
            customer_id = %after.customer_id,
            from = %before.inferred_category,
            to = %after.inferred_category,
            "line item reclassified"
        );

        Ok(ReclassificationOutcome {
            xp_earned: decision.xp_earned(),
            classification: after,
        })
    }

    /// Mark a record as reviewed and correct.
    #[instrument(skip(self, actor))]
    pub async fn approve_item(&self, inference_id: Uuid, actor: &str) -> DomainResult<LineItemClassification> {
        require_actor(actor)?;
        let before = self.load(inference_id).await?;

        if !before.status.can_transition_to(ClassificationStatus::Approved) {
            return Err(DomainError::Validation(format!(
                "A {} line item cannot be approved",
                before.status.as_str()
            )));
        }

        let mut after = before.clone();
        after.status = ClassificationStatus::Approved;
        after.needs_review = false;
        stamp_reviewer(&mut after, actor);

        self.applier
            .apply_item(actor, AuditAction::Approve, &before, &after)
            .await?;
        Ok(after)
    }

    async fn load(&self, inference_id: Uuid) -> DomainResult<LineItemClassification> {
        self.classifications
            .get(inference_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Line item", inference_id))
    }
}

pub(crate) fn require_actor(actor: &str) -> DomainResult<()> {
    if actor.trim().is_empty() {
        return Err(DomainError::Validation("An actor is required for changes".to_string()));
    }
    Ok(())
}
