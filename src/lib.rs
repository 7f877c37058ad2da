//! Fetch MFA-backed AWS session credentials and merge them into a `.env` file.
//!
//! The interesting part lives in [`dotenv`] and [`updater`]: a line-preserving
//! `.env` model and an engine that rewrites only the keys a file already
//! declares, then atomically replaces it. [`credentials`] is the AWS glue that
//! produces the replacement values.

pub mod cli;
pub mod credentials;
pub mod dotenv;
pub mod error;
pub mod updater;

pub use dotenv::{Applied, Document, Line, Replacements};
pub use error::{Error, Result};
pub use updater::{DotenvUpdater, update};
