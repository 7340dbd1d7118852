//! `revclass feedback`: bulk category feedback.

use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::FeedbackRequest;
use crate::services::CategoryFeedbackOutcome;

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// Free-text feedback, e.g. "servers are hardware, not SaaS"
    pub text: String,

    /// Customer whose line items the feedback applies to
    #[arg(long)]
    pub customer: Uuid,

    /// Limit the feedback to one category
    #[arg(short = 'k', long)]
    pub category: Option<String>,

    /// Update every low-confidence item in --category, ignoring the match pattern
    #[arg(long)]
    pub low_confidence: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct FeedbackOutput {
    #[serde(flatten)]
    pub outcome: CategoryFeedbackOutcome,
}

impl CommandOutput for FeedbackOutput {
    fn to_human(&self) -> String {
        let o = &self.outcome;
        let headline = if o.updated_count == 0 {
            format!(
                "No line items matched \"{}\" among {} candidate(s); nothing changed.",
                o.pattern_to_match, o.candidate_count
            )
        } else {
            format!(
                "Moved {} of {} line item(s) to '{}'.",
                o.updated_count, o.candidate_count, o.new_category
            )
        };
        format!("{headline}\nRationale: {}", o.rationale)
    }
}

pub async fn execute(args: FeedbackArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let mut request = FeedbackRequest::new(args.customer, args.text);
    if let Some(category) = args.category {
        request = request.in_category(category);
    }
    if args.low_confidence {
        request = request.low_confidence_only();
    }

    let outcome = ctx
        .feedback_service()?
        .submit_category_feedback(&request, &ctx.actor)
        .await?;
    output(&FeedbackOutput { outcome }, json_mode);
    Ok(())
}
