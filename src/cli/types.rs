//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    audit::AuditArgs, category::CategoryArgs, feedback::FeedbackArgs, init::InitArgs, item::ItemArgs,
    subscription::SubscriptionArgs,
};

#[derive(Parser, Debug)]
#[command(name = "revclass")]
#[command(about = "revclass - review and correct revenue classifications of billing line items", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .revclass/config.yaml with local.yaml and env overrides)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Name recorded in the audit trail for changes
    #[arg(long, global = true, env = "REVCLASS_ACTOR")]
    pub actor: Option<String>,
}

impl Cli {
    /// `--actor`, else the login name, else "cli".
    ///
    /// An explicit blank actor is returned as given and rejected by the service.
    pub fn actor(&self) -> String {
        self.actor
            .clone()
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| "cli".to_string())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database in a directory
    Init(InitArgs),

    /// Send free-text feedback that recategorizes a customer's line items
    Feedback(FeedbackArgs),

    /// Line item review: reclassify, approve, import, list
    Item(ItemArgs),

    /// Category operations: rename, merge, statistics, catalog
    Category(CategoryArgs),

    /// Subscription corrections and audit flag
    Subscription(SubscriptionArgs),

    /// Read the audit trail
    Audit(AuditArgs),
}
