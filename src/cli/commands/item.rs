//! Line item CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{confidence_cell, list_table, output, render_list, short_id, truncate, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{AuditTarget, LineItemClassification};
use crate::domain::ports::{CandidateQuery, ClassificationRepository};
use crate::services::ImportSummary;

#[derive(Args, Debug)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommands,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Reclassify one line item from reviewer feedback
    Reclassify {
        /// Line item ID
        id: Uuid,
        /// What is wrong with the current classification
        feedback: String,
    },
    /// Approve a line item's current classification
    Approve {
        /// Line item ID
        id: Uuid,
    },
    /// Import classified line items from a JSON array
    Import {
        #[arg(long)]
        customer: Uuid,
        /// JSON file
        file: PathBuf,
    },
    /// List a customer's line items
    List {
        #[arg(long)]
        customer: Uuid,
        /// Only this category
        #[arg(short = 'k', long)]
        category: Option<String>,
        /// Only items below the low-confidence threshold
        #[arg(long)]
        low_confidence: bool,
        /// Maximum number of items to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Show one line item and its history
    Show {
        /// Line item ID
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ItemListOutput {
    pub items: Vec<LineItemClassification>,
    pub total: usize,
}

impl CommandOutput for ItemListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "product - plan - charge", "category", "conf", "status", "review"]);
        for item in &self.items {
            table.add_row(vec![
                short_id(&item.id),
                truncate(&item.display_line(), 48),
                item.inferred_category.clone(),
                confidence_cell(item.confidence),
                item.status.as_str().to_string(),
                if item.needs_review { "yes" } else { "" }.to_string(),
            ]);
        }
        render_list("line item", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ItemDetailOutput {
    pub item: LineItemClassification,
    pub history: Vec<String>,
}

impl CommandOutput for ItemDetailOutput {
    fn to_human(&self) -> String {
        let item = &self.item;
        let mut lines = vec![
            format!("Line item: {}", item.display_line()),
            format!("ID: {}", item.id),
            format!("Category: {}", item.inferred_category),
            format!("Pattern of business: {}", item.inferred_pattern_of_business.as_deref().unwrap_or("-")),
            format!("Confidence: {}", confidence_cell(item.confidence)),
            format!("Status: {}", item.status.as_str()),
        ];
        if !item.rationale.is_empty() {
            lines.push(format!("Rationale: {}", item.rationale));
        }
        if !item.conflict_flags.is_empty() {
            let flags: Vec<&str> = item.conflict_flags.iter().map(String::as_str).collect();
            lines.push(format!("Conflicts: {}", flags.join(", ")));
        }
        if let Some(reviewer) = &item.last_reviewed_by {
            lines.push(format!("Last reviewed by: {reviewer}"));
        }
        if !self.history.is_empty() {
            lines.push("\nHistory:".to_string());
            lines.extend(self.history.iter().map(|h| format!("  - {h}")));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ReclassifyOutput {
    pub item: LineItemClassification,
    pub xp_earned: u32,
}

impl CommandOutput for ReclassifyOutput {
    fn to_human(&self) -> String {
        format!(
            "{} is now '{}' (confidence {}). +{} XP\nRationale: {}",
            self.item.display_line(),
            self.item.inferred_category,
            confidence_cell(self.item.confidence),
            self.xp_earned,
            self.item.rationale
        )
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ItemActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ItemActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ImportOutput {
    #[serde(flatten)]
    pub summary: ImportSummary,
}

impl CommandOutput for ImportOutput {
    fn to_human(&self) -> String {
        format!(
            "Imported {} line item(s); created {} subscription(s), {} link(s).",
            self.summary.line_items, self.summary.subscriptions_created, self.summary.links
        )
    }
}

pub async fn execute(args: ItemArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        ItemCommands::Reclassify { id, feedback } => {
            let outcome = ctx
                .feedback_service()?
                .reclassify_single_item(id, &feedback, &ctx.actor)
                .await?;
            output(
                &ReclassifyOutput {
                    item: outcome.classification,
                    xp_earned: outcome.xp_earned,
                },
                json_mode,
            );
        }
        ItemCommands::Approve { id } => {
            let item = ctx.feedback_service()?.approve_item(id, &ctx.actor).await?;
            output(
                &ItemActionOutput {
                    success: true,
                    message: format!("Approved {} as '{}'.", item.display_line(), item.inferred_category),
                },
                json_mode,
            );
        }
        ItemCommands::Import { customer, file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = ctx.import_service().import_json(customer, &json).await?;
            output(&ImportOutput { summary }, json_mode);
        }
        ItemCommands::List {
            customer,
            category,
            low_confidence,
            limit,
        } => {
            let query = CandidateQuery {
                category,
                confidence_below: low_confidence.then_some(ctx.config.matching.low_confidence_threshold),
                ..CandidateQuery::for_customer(customer, limit)
            };
            let items = ctx.classifications().find_candidates(&query).await?;
            let total = items.len();
            output(&ItemListOutput { items, total }, json_mode);
        }
        ItemCommands::Show { id } => {
            let item = ctx
                .classifications()
                .get(id)
                .await?
                .ok_or_else(|| DomainError::not_found("Line item", id))?;
            let history = ctx
                .audit_trail_service()
                .for_target(AuditTarget::Classification(id), Some(20))
                .await?
                .iter()
                .map(|e| format!("{} {}", e.created_at.format("%Y-%m-%d %H:%M"), e.summary()))
                .collect();
            output(&ItemDetailOutput { item, history }, json_mode);
        }
    }
    Ok(())
}
