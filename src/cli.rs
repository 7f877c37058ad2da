//! Command-line interface definitions.

use std::{ops::RangeInclusive, path::PathBuf};

use clap::Parser;

use crate::error::{Error, Result};

/// Valid `--duration-hours` values, as accepted by STS for IAM users.
pub const DURATION_HOURS: RangeInclusive<u32> = 1..=36;

/// Fetch temporary AWS credentials and merge them into a dotenv file (.env).
///
/// Looks up the MFA device of the IAM user behind `--profile`, exchanges the
/// given code for session credentials and rewrites `AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` in `.env`. Keys the file
/// does not already declare are not added.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Current code from the MFA device
    #[arg(value_name = "MFA_CODE")]
    pub mfa_code: String,

    /// AWS profile to fetch temporary credentials with
    #[arg(short, long, env = "AWS_PROFILE", default_value = "default")]
    pub profile: String,

    /// Duration, in hours, the credentials should remain valid (1-36)
    #[arg(short, long, env = "AWS_MFA_DURATION_HOURS", default_value = "36")]
    pub duration_hours: u32,

    /// Directory containing the .env file [default: current directory]
    #[arg(short = 'C', long)]
    pub directory: Option<PathBuf>,
}

/// Validated settings for one run. Built once from [`Args`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mfa_code: String,
    pub profile: String,
    pub duration_hours: u32,
    pub directory: PathBuf,
}

impl Config {
    pub fn duration_secs(&self) -> u32 {
        self.duration_hours * 60 * 60
    }
}

impl Args {
    /// Validates the arguments and resolves the target directory.
    pub fn into_config(self) -> Result<Config> {
        let mfa_code = self.mfa_code.trim().to_string();
        if mfa_code.len() != 6 || !mfa_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidMfaCode(mfa_code));
        }

        if !DURATION_HOURS.contains(&self.duration_hours) {
            return Err(Error::DurationOutOfRange {
                hours: self.duration_hours,
                min: *DURATION_HOURS.start(),
                max: *DURATION_HOURS.end(),
            });
        }

        let directory = match self.directory {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(Error::CurrentDir)?,
        };

        Ok(Config {
            mfa_code,
            profile: self.profile,
            duration_hours: self.duration_hours,
            directory,
        })
    }
}
