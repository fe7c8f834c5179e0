//! Builds the [`VoyageClient`] used by every command.

use anyhow::{Context, Result};
use voyage_core::config::VoyageConfig;
use voyage_core::telemetry::init_logging;
use voyage_core::{VoyageClient, VoyageError};

use crate::commands::config::load_api_url;

/// Load configuration, start logging and restore the stored session.
///
/// The API URL comes from `--api-url`/`VOYAGE_API_URL` first, then the
/// `api-url` key of the CLI config file, then `VOYAGE__API__BASE_URL`.
pub fn connect(api_url: Option<String>, verbose: u8) -> Result<VoyageClient> {
    let mut config = VoyageConfig::load().context("Failed to load configuration")?;

    match verbose {
        0 => {}
        1 => config.logging.level = "info".to_string(),
        _ => config.logging.level = "debug".to_string(),
    }
    // A second subscriber in the same process is not an error worth failing on.
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("logging disabled: {}", e);
    }

    if let Some(url) = api_url.or_else(load_api_url) {
        config.api.base_url = url;
    }

    tracing::debug!(base_url = %config.api.base_url, "Connecting");
    Ok(VoyageClient::from_config(config)?)
}

/// Human-readable description of a command failure.
pub fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<VoyageError>() {
        Some(e) if e.requires_login() => {
            format!("{} (run `voyage login` first)", e.user_message())
        }
        Some(e) => match e.internal_message() {
            Some(internal) if tracing::enabled!(tracing::Level::DEBUG) => {
                format!("{} [{}]: {}", e.user_message(), e.code(), internal)
            }
            _ => format!("{} [{}]", e.user_message(), e.code()),
        },
        None => format!("{:#}", err),
    }
}
