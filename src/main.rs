//! AWS MFA dotenv updater
//!
//! Refreshes the AWS session credentials stored in a project's `.env` file:
//! 1. Parses and validates command-line arguments into a [`Config`]
//! 2. Exchanges the MFA code for temporary credentials via STS
//! 3. Rewrites `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
//!    `AWS_SESSION_TOKEN` in `.env`, leaving everything else untouched
//!
//! `main` is the only place that turns a result into a process exit code.

use std::process::ExitCode;

use aws_mfa_dotenv::{
    DotenvUpdater, Error, Result,
    cli::{Args, Config},
    credentials::fetch_session_credentials,
};
use clap::Parser;
use log::{error, info, warn};

/// Main entry point for the AWS MFA dotenv updater.
///
/// This function orchestrates a single refresh:
/// 1. Initializes logging with INFO level filtering
/// 2. Parses command-line arguments and validates them into a [`Config`]
/// 3. Runs the refresh via [`run`]
/// 4. Translates the outcome into the process exit code
///
/// # Returns
/// * `ExitCode::SUCCESS` - If `.env` was rewritten with fresh credentials
/// * The failure's [`Error::exit_code`] - 1 for a malformed MFA code, 2 for an
///   out-of-range duration, 3 for AWS failures, 4 for `.env` I/O failures
#[tokio::main]
async fn main() -> ExitCode {
    // INFO by default, RUST_LOG overrides.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let result = match Args::parse().into_config() {
        Ok(config) => run(&config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            error!("{:#}", anyhow::Error::from(err));
            ExitCode::from(code)
        }
    }
}

/// Fetches session credentials and merges them into the configured `.env`.
///
/// # Arguments
/// * `config` - Validated settings for this run
///
/// # Errors
/// This function will return an error if:
/// * Session credentials cannot be fetched ([`Error::Credentials`])
/// * `.env` cannot be read or written ([`Error::Dotenv`])
///
/// A `.env` that declares none of the AWS keys is not an error; it is left
/// as is and a warning is logged.
async fn run(config: &Config) -> Result<()> {
    let session =
        fetch_session_credentials(&config.profile, &config.mfa_code, config.duration_secs())
            .await
            .map_err(Error::Credentials)?;

    let updater = DotenvUpdater::new(&config.directory);
    let applied = updater.update(&session.replacements()).await?;
    if applied.updated.is_empty() {
        warn!(
            "{} declares none of the AWS credential keys, no values changed",
            updater.path().display()
        );
    }

    info!(
        "Success! {} updated, credentials expire at: {}",
        updater.path().display(),
        session.expires_at()
    );
    Ok(())
}
