//! Command-line surface for the review console.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use crate::domain::errors::DomainError;

/// Print a failed command's error and exit with status 1.
///
/// Domain errors are shown through their user-facing message; the full
/// chain goes to the log at debug level.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    tracing::debug!(error = ?err, "command failed");

    let (message, kind) = match err.downcast_ref::<DomainError>() {
        Some(domain) => (domain.user_message(), domain.kind()),
        None => (format!("{err:#}"), "internal"),
    };

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "error": message, "kind": kind }))
                .unwrap_or_default()
        );
    } else {
        eprintln!("Error: {message}");
    }
    std::process::exit(1)
}

/// Run one parsed command.
pub async fn run(cli: Cli, config: crate::domain::models::Config) -> anyhow::Result<()> {
    let actor = cli.actor();
    let json = cli.json;

    if let Commands::Init(args) = cli.command {
        return commands::init::execute(args, json).await;
    }

    let ctx = AppContext::open(config, actor).await?;
    match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Feedback(args) => commands::feedback::execute(args, &ctx, json).await,
        Commands::Item(args) => commands::item::execute(args, &ctx, json).await,
        Commands::Category(args) => commands::category::execute(args, &ctx, json).await,
        Commands::Subscription(args) => commands::subscription::execute(args, &ctx, json).await,
        Commands::Audit(args) => commands::audit::execute(args, &ctx, json).await,
    }
}
