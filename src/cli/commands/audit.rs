//! Audit trail CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{list_table, output, render_list, short_id, truncate, CommandOutput};
use crate::domain::models::{AuditAction, AuditEntry, AuditTarget};

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Audit entries for a customer, newest first
    List {
        #[arg(long)]
        customer: Uuid,
        /// Only one action (e.g. category_feedback, reclassify, merge_category)
        #[arg(short, long)]
        action: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// History of one line item, subscription, or a customer's category operations
    History {
        #[arg(value_enum)]
        kind: TargetKind,
        id: Uuid,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TargetKind {
    Item,
    Subscription,
    /// Category renames and merges; the id is the customer id
    Category,
}

impl TargetKind {
    fn target(self, id: Uuid) -> AuditTarget {
        match self {
            Self::Item => AuditTarget::Classification(id),
            Self::Subscription => AuditTarget::Subscription(id),
            Self::Category => AuditTarget::CategoryOp(id),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AuditListOutput {
    pub entries: Vec<AuditEntry>,
}

impl CommandOutput for AuditListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["when", "actor", "action", "target", "summary"]);
        for entry in &self.entries {
            table.add_row(vec![
                entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.actor.clone(),
                entry.action.as_str().to_string(),
                format!("{} {}", entry.target.entity_type(), short_id(&entry.target.entity_id())),
                truncate(&entry.summary(), 60),
            ]);
        }
        render_list("audit entry", &table, self.entries.len())
    }
}

pub async fn execute(args: AuditArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.audit_trail_service();

    let entries = match args.command {
        AuditCommands::List { customer, action, limit } => {
            let action = action
                .map(|a| AuditAction::from_str(&a).ok_or_else(|| anyhow!("Unknown audit action: {a}")))
                .transpose()?;
            service.for_customer(customer, action, Some(limit)).await?
        }
        AuditCommands::History { kind, id, limit } => service.for_target(kind.target(id), Some(limit)).await?,
    };

    output(&AuditListOutput { entries }, json_mode);
    Ok(())
}
