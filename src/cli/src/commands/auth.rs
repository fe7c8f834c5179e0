//! Login, logout and identity commands.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::io::{BufRead, Write};
use voyage_core::gate::{AuthOutcome, IntentToken, RestoreOutcome};
use voyage_core::session::{SessionStorage, UserIdentity, PENDING_INTENT_KEY};
use voyage_core::VoyageClient;

use super::book;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LoginArgs {
    /// Account email (prompted when omitted)
    #[arg(short, long, env = "VOYAGE_EMAIL")]
    email: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long, env = "VOYAGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Drop a booking started while logged out instead of completing it
    #[arg(long)]
    discard_pending: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WhoAmI {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_package_id: Option<i64>,
}

pub async fn login(args: LoginArgs, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let gate = voyage.gate();

    match gate.recover().await? {
        Some(RestoreOutcome::Executed(result)) => book::report_receipt(result, format)?,
        Some(RestoreOutcome::Deferred | RestoreOutcome::AlreadyPending) if format.is_table() => {
            if let Some(package_id) = gate.pending_intent().and_then(|i| i.package_id()) {
                output::print_info(&format!(
                    "Booking for package {} will complete after login",
                    package_id
                ));
            }
        }
        _ => {}
    }
    if args.discard_pending {
        if let Some(intent) = gate.on_auth_cancelled() {
            output::print_info(&format!(
                "Discarded pending booking for package {}",
                intent.package_id().unwrap_or_default()
            ));
        }
    }

    let email = match args.email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let session = match voyage.api().auth().login(&email, &password).await {
        Ok(session) => session,
        Err(e) => {
            if gate.is_awaiting_auth() {
                output::print_info("Your booking is still waiting; try `voyage login` again");
            }
            return Err(e.into());
        }
    };
    let identity = session.identity.clone();

    let outcome = gate.on_auth_success(session).await?;
    if format.is_table() {
        output::print_success(&format!(
            "Logged in as {} <{}> ({})",
            display_name(&identity),
            identity.email,
            identity.role
        ));
    }

    match outcome {
        AuthOutcome::Resumed(result) => book::report_receipt(result, format),
        AuthOutcome::NothingPending if format.is_table() => Ok(()),
        AuthOutcome::NothingPending => output::print_item(&identity, format),
    }
}

pub async fn logout(voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let was_authenticated = voyage.sessions().current().is_some();
    voyage.sessions().logout()?;

    if format.is_table() {
        if was_authenticated {
            output::print_success("Logged out");
        } else {
            output::print_info("Not logged in");
        }
        Ok(())
    } else {
        output::print_item(&serde_json::json!({ "loggedOut": was_authenticated }), format)
    }
}

pub async fn whoami(voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    let session = voyage.sessions().valid_session();
    // Read the parked intent without restoring it; restoring with a valid
    // session would run the booking.
    let pending_package_id = voyage
        .sessions()
        .storage()
        .get(PENDING_INTENT_KEY)?
        .and_then(|encoded| IntentToken::decode(&encoded).ok())
        .and_then(|token| token.intent().package_id());

    let view = WhoAmI {
        authenticated: session.is_some(),
        user: session.as_ref().map(|s| s.identity.clone()),
        expires_at: session.as_ref().and_then(|s| s.expires_at),
        pending_package_id,
    };

    if !format.is_table() {
        return output::print_item(&view, format);
    }

    match &session {
        Some(session) => {
            output::print_header("Current user");
            output::print_detail("Name", display_name(&session.identity));
            output::print_detail("Email", &session.identity.email);
            output::print_detail("Role", &session.identity.role.to_string());
            output::print_detail("User ID", &session.identity.user_id);
            let expires = session
                .expires_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            output::print_detail("Expires", &expires);
        }
        None => output::print_info("Not logged in"),
    }
    if let Some(package_id) = view.pending_package_id {
        output::print_info(&format!(
            "Booking for package {} is waiting for login",
            package_id
        ));
    }
    Ok(())
}

fn display_name(identity: &UserIdentity) -> &str {
    if identity.full_name.is_empty() {
        &identity.email
    } else {
        &identity.full_name
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
