//! Subscription CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{confidence_cell, list_table, output, render_list, short_id, CommandOutput};
use crate::domain::models::{BillingPeriod, Subscription, SubscriptionPatch, SubscriptionStatus};

#[derive(Args, Debug)]
pub struct SubscriptionArgs {
    #[command(subcommand)]
    pub command: SubscriptionCommands,
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionCommands {
    /// List a customer's subscriptions
    List {
        #[arg(long)]
        customer: Uuid,
    },
    /// Show a subscription with its derivation trace
    Show { id: Uuid },
    /// Manually correct billing attributes
    Correct {
        id: Uuid,
        #[command(flatten)]
        attributes: CorrectionArgs,
    },
    /// Mark a subscription as audited (or clear the flag)
    Audited {
        id: Uuid,
        /// Clear the flag instead of setting it
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CorrectionArgs {
    #[arg(long)]
    pub termed: Option<bool>,
    #[arg(long)]
    pub evergreen: Option<bool>,
    #[arg(long)]
    pub cancellation: Option<bool>,
    #[arg(long)]
    pub ramp: Option<bool>,
    #[arg(long)]
    pub discount: Option<bool>,
    /// monthly, quarterly, semi_annual, annual, multi_year, one_time
    #[arg(long)]
    pub billing_period: Option<String>,
    /// Three-letter currency code
    #[arg(long)]
    pub currency: Option<String>,
    /// active, pending, cancelled, expired
    #[arg(long)]
    pub status: Option<String>,
}

impl CorrectionArgs {
    fn into_patch(self) -> Result<SubscriptionPatch> {
        let billing_period = self
            .billing_period
            .map(|p| BillingPeriod::from_str(&p).ok_or_else(|| anyhow!("Invalid billing period: {p}")))
            .transpose()?;
        let status = self
            .status
            .map(|s| SubscriptionStatus::from_str(&s).ok_or_else(|| anyhow!("Invalid status: {s}")))
            .transpose()?;

        Ok(SubscriptionPatch {
            termed: self.termed,
            evergreen: self.evergreen,
            has_cancellation: self.cancellation,
            has_ramp: self.ramp,
            has_discount: self.discount,
            billing_period,
            currency: self.currency.map(|c| c.trim().to_uppercase()),
            status,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SubscriptionListOutput {
    pub subscriptions: Vec<Subscription>,
}

impl CommandOutput for SubscriptionListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "number", "period", "currency", "status", "conf", "audited"]);
        for s in &self.subscriptions {
            table.add_row(vec![
                short_id(&s.id),
                s.subscription_number.clone(),
                s.billing_period.as_str().to_string(),
                s.currency.clone(),
                s.status.as_str().to_string(),
                confidence_cell(s.confidence),
                if s.audited { "yes" } else { "" }.to_string(),
            ]);
        }
        render_list("subscription", &table, self.subscriptions.len())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SubscriptionDetailOutput {
    pub subscription: Subscription,
}

impl CommandOutput for SubscriptionDetailOutput {
    fn to_human(&self) -> String {
        let s = &self.subscription;
        let flag = |b: bool| if b { "yes" } else { "no" };
        let mut lines = vec![
            format!("Subscription: {}", s.subscription_number),
            format!("ID: {}", s.id),
            format!("Status: {}", s.status.as_str()),
            format!("Billing period: {}", s.billing_period.as_str()),
            format!("Currency: {}", s.currency),
            format!("Termed: {}  Evergreen: {}", flag(s.termed), flag(s.evergreen)),
            format!(
                "Cancellation: {}  Ramp: {}  Discount: {}",
                flag(s.has_cancellation),
                flag(s.has_ramp),
                flag(s.has_discount)
            ),
            format!("Audited: {}", flag(s.audited)),
        ];
        if !s.derivation_trace.is_empty() {
            lines.push("\nDerivation:".to_string());
            lines.extend(s.derivation_trace.iter().map(|(k, v)| format!("  {k}: {v}")));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: SubscriptionArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.subscription_service();

    match args.command {
        SubscriptionCommands::List { customer } => {
            let subscriptions = service.list(customer).await?;
            output(&SubscriptionListOutput { subscriptions }, json_mode);
        }
        SubscriptionCommands::Show { id } => {
            let subscription = service.get(id).await?;
            output(&SubscriptionDetailOutput { subscription }, json_mode);
        }
        SubscriptionCommands::Correct { id, attributes } => {
            let patch = attributes.into_patch()?;
            let subscription = service.correct_subscription(id, &patch, &ctx.actor).await?;
            output(&SubscriptionDetailOutput { subscription }, json_mode);
        }
        SubscriptionCommands::Audited { id, clear } => {
            let subscription = service.set_subscription_audited(id, !clear, &ctx.actor).await?;
            output(&SubscriptionDetailOutput { subscription }, json_mode);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correction_args_into_patch() {
        let patch = CorrectionArgs {
            termed: Some(true),
            billing_period: Some("Quarterly".to_string()),
            currency: Some(" eur ".to_string()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.termed, Some(true));
        assert_eq!(patch.billing_period, Some(BillingPeriod::Quarterly));
        assert_eq!(patch.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_unknown_billing_period_is_rejected() {
        let args = CorrectionArgs {
            billing_period: Some("weekly".to_string()),
            ..Default::default()
        };
        assert!(args.into_patch().is_err());
    }
}
