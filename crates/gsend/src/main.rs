//! `gsend` - send an email with attachments through the Gmail API.
//!
//! Obtains (or refreshes) an OAuth2 credential, composes a multipart
//! message and submits it with a single API call.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Config};
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "gsend=info,gsend_gmail=info,gsend_oauth=info";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with_writer(std::io::stdout)
        .finish();

    tracing::subscriber::with_default(subscriber, || match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{} failed due to error: {err:#}", program_name());
            ExitCode::FAILURE
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    let span = info_span!("gsend");
    let _guard = span.enter();
    info!("Starting send email process");

    let config = Config::from_cli(cli)?;

    let credential = gsend_oauth::get_credentials(&config.credentials_file, &config.token_file)
        .context("Failed to obtain Gmail credentials")?;
    let service = gsend_gmail::build_service(&credential)?;
    let message = gsend_gmail::build_message(&config.email)?;
    gsend_gmail::send_email(&service, &message)?;

    info!("Send email process complete");
    Ok(())
}

/// Basename of the invoked executable.
fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map_or_else(
            || env!("CARGO_PKG_NAME").to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}
