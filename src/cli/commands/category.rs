//! Category CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{confidence_cell, list_table, output, render_list, CommandOutput};
use crate::domain::models::{CategoryCatalogEntry, CategoryStats};
use crate::services::CategoryOpOutcome;

#[derive(Args, Debug)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Rename a category for one customer
    Rename {
        #[arg(long)]
        customer: Uuid,
        /// Current name
        old: String,
        /// New name (must not already be in use)
        new: String,
    },
    /// Move every line item of one category into another existing category
    Merge {
        #[arg(long)]
        customer: Uuid,
        /// Category to empty
        from: String,
        /// Category receiving the line items
        to: String,
    },
    /// Per-category counts and confidence breakdown
    Stats {
        #[arg(long)]
        customer: Uuid,
    },
    /// Categories visible to a customer
    List {
        #[arg(long)]
        customer: Uuid,
    },
    /// Add a customer-scoped category
    Add {
        #[arg(long)]
        customer: Uuid,
        name: String,
        /// Pattern of business for the category
        #[arg(long)]
        pob: Option<String>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct CategoryOpOutput {
    pub action: &'static str,
    #[serde(flatten)]
    pub outcome: CategoryOpOutcome,
}

impl CommandOutput for CategoryOpOutput {
    fn to_human(&self) -> String {
        let o = &self.outcome;
        match (self.action, o.prpc_count) {
            ("merge", 0) => format!("'{}' has no line items; nothing to merge.", o.from_category),
            ("merge", n) => format!("Merged {n} line item(s) from '{}' into '{}'.", o.from_category, o.to_category),
            (_, n) => format!("Renamed '{}' to '{}' ({n} line item(s)).", o.from_category, o.to_category),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    pub categories: Vec<CategoryStats>,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "category", "items", "subs", "avg conf", "approved", "review", "low", "med", "high",
        ]);
        for s in &self.categories {
            table.add_row(vec![
                s.category.clone(),
                s.prpc_count.to_string(),
                s.subscription_count.to_string(),
                confidence_cell(s.avg_confidence),
                format!("{:.0}%", s.approval_rate * 100.0),
                s.needs_review_count.to_string(),
                s.low_confidence_count.to_string(),
                s.medium_confidence_count.to_string(),
                s.high_confidence_count.to_string(),
            ]);
        }
        render_list("category", &table, self.categories.len())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CatalogOutput {
    pub entries: Vec<CategoryCatalogEntry>,
}

impl CommandOutput for CatalogOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["category", "pattern of business", "scope"]);
        for entry in &self.entries {
            table.add_row(vec![
                entry.category_name.clone(),
                entry.pattern_of_business_name.clone().unwrap_or_else(|| "-".to_string()),
                if entry.is_global() { "global" } else { "customer" }.to_string(),
            ]);
        }
        render_list("category", &table, self.entries.len())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CategoryAddOutput {
    pub added: bool,
    pub message: String,
}

impl CommandOutput for CategoryAddOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn execute(args: CategoryArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.category_service();

    match args.command {
        CategoryCommands::Rename { customer, old, new } => {
            let outcome = service.rename(customer, &old, &new, &ctx.actor).await?;
            output(&CategoryOpOutput { action: "rename", outcome }, json_mode);
        }
        CategoryCommands::Merge { customer, from, to } => {
            let outcome = service.merge(customer, &from, &to, &ctx.actor).await?;
            output(&CategoryOpOutput { action: "merge", outcome }, json_mode);
        }
        CategoryCommands::Stats { customer } => {
            let categories = service.stats(customer).await?;
            output(&StatsOutput { categories }, json_mode);
        }
        CategoryCommands::List { customer } => {
            let entries = service.list_catalog(customer).await?;
            output(&CatalogOutput { entries }, json_mode);
        }
        CategoryCommands::Add { customer, name, pob } => {
            let added = service.add_category(customer, &name, pob.as_deref()).await?;
            let message = if added {
                format!("Added category '{}'.", name.trim())
            } else {
                format!("Category '{}' already exists.", name.trim())
            };
            output(&CategoryAddOutput { added, message }, json_mode);
        }
    }
    Ok(())
}
