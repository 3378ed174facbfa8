//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No home directory could be determined for the default config location.
    #[display("could not determine a configuration directory")]
    NoConfigDir,
    /// The settings file has an extension that isn't TOML or JSON.
    #[display("unsupported settings file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// Merged configuration sources did not deserialize into [`Settings`](crate::Settings).
    #[display("invalid settings")]
    Invalid,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
