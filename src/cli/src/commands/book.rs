//! Booking command.
//!
//! Booking is a protected action: without a valid session the request is
//! parked in the session file and `voyage login` completes it.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use voyage_core::api::types::BookingConfirmation;
use voyage_core::gate::{ActionIntent, ActionReceipt, GateOutcome, IntentToken, RestoreOutcome};
use voyage_core::VoyageClient;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct BookArgs {
    /// Package to book
    #[arg(required_unless_present_any = ["resume", "cancel"], conflicts_with_all = ["resume", "cancel"])]
    package_id: Option<i64>,

    /// Resume from a package link (`/packages/77?booking=true`) or intent token
    #[arg(long, value_name = "LINK_OR_TOKEN", conflicts_with = "cancel")]
    resume: Option<String>,

    /// Drop the booking waiting for login
    #[arg(long)]
    cancel: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingView {
    status: &'static str,
    package_id: Option<i64>,
    intent: String,
    link: Option<String>,
}

pub async fn execute(args: BookArgs, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let gate = voyage.gate();

    // Load what an earlier invocation left pending; a new booking replaces it.
    if let Some(RestoreOutcome::Executed(result)) = gate.recover().await? {
        report_receipt(result, format)?;
    }

    if args.cancel {
        match gate.on_auth_cancelled() {
            Some(intent) => output::print_success(&format!(
                "Discarded pending booking for package {}",
                intent.package_id().unwrap_or_default()
            )),
            None => output::print_info("No booking is waiting for login"),
        }
        return Ok(());
    }

    if let Some(input) = args.resume {
        let token = IntentToken::parse(&input)?;
        let outcome = gate.restore(token).await?;
        return report_restore(outcome, voyage, format);
    }

    let Some(package_id) = args.package_id else {
        anyhow::bail!("A package id is required");
    };
    match gate.request_action(ActionIntent::book(package_id)).await? {
        GateOutcome::Executed(outcome) => report_receipt(outcome, format),
        GateOutcome::Deferred => report_deferred(voyage, format),
    }
}

/// Print a completed booking, or turn its failure into the command error.
pub fn report_receipt(
    outcome: voyage_core::Result<ActionReceipt>,
    format: OutputFormat,
) -> Result<()> {
    let receipt = outcome?;
    if !format.is_table() {
        return output::print_item(&receipt, format);
    }

    let confirmation: BookingConfirmation =
        serde_json::from_value(receipt.detail.clone()).unwrap_or_default();
    match confirmation.booking_id {
        Some(id) => output::print_success(&format!("Booking #{} created", id)),
        None => output::print_success("Booking created"),
    }
    if let Some(package_id) = confirmation.package_id {
        output::print_detail("Package", &package_id.to_string());
    }
    if let Some(status) = confirmation.status {
        output::print_detail("Status", &status);
    }
    output::print_detail(
        "Completed",
        &receipt.completed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    Ok(())
}

fn report_restore(
    outcome: RestoreOutcome,
    voyage: &VoyageClient,
    format: OutputFormat,
) -> Result<()> {
    match outcome {
        RestoreOutcome::Executed(outcome) => report_receipt(outcome, format),
        RestoreOutcome::Deferred | RestoreOutcome::AlreadyPending => {
            report_deferred(voyage, format)
        }
        RestoreOutcome::Ignored => {
            tracing::debug!("Intent already handled");
            if format.is_table() {
                output::print_info("This booking link was already used");
            }
            Ok(())
        }
    }
}

fn report_deferred(voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let Some(intent) = voyage.gate().pending_intent() else {
        return Ok(());
    };
    let package_id = intent.package_id();
    let token = IntentToken::new(intent);

    if !format.is_table() {
        return output::print_item(
            &PendingView {
                status: "awaiting_login",
                package_id,
                intent: token.encode()?,
                link: token.to_location().ok(),
            },
            format,
        );
    }

    output::print_info(&format!(
        "Log in to finish booking package {}: run `voyage login`",
        package_id.unwrap_or_default()
    ));
    if let Ok(link) = token.to_location() {
        output::print_detail("Link", &link);
    }
    Ok(())
}
