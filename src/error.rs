//! Error types and their process exit codes.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Every way a run can fail, classified so `main` can pick an exit code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("MFA code must be six digits, got {0:?}")]
    InvalidMfaCode(String),

    #[error("duration must be between {min} and {max} hours, got {hours}")]
    DurationOutOfRange { hours: u32, min: u32, max: u32 },

    #[error("could not determine the current directory")]
    CurrentDir(#[source] io::Error),

    #[error("failed to fetch session credentials")]
    Credentials(#[source] anyhow::Error),

    #[error("failed to update {}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Exit code reported to the shell for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidMfaCode(_) => 1,
            Error::DurationOutOfRange { .. } => 2,
            Error::Credentials(_) => 3,
            Error::CurrentDir(_) | Error::Dotenv { .. } => 4,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_keep_legacy_exit_codes() {
        assert_eq!(Error::InvalidMfaCode(String::new()).exit_code(), 1);
        let err = Error::DurationOutOfRange {
            hours: 40,
            min: 1,
            max: 36,
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "duration must be between 1 and 36 hours, got 40"
        );
    }

    #[test]
    fn dotenv_error_names_the_file_and_keeps_the_cause() {
        let err = Error::Dotenv {
            path: PathBuf::from("/tmp/x/.env"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "failed to update /tmp/x/.env");
        let source = std::error::Error::source(&err).expect("source is kept");
        assert!(source.to_string().to_lowercase().contains("permission"));
    }
}
