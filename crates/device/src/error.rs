//! Device Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A device error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The device content database could not be opened, read or updated.
    #[display("device database error")]
    Database,
    /// A style sheet could not be copied onto the device.
    #[display("could not stage style sheet {}", _0.display())]
    Stylesheet(#[error(not(source))] PathBuf),
    /// The eReader configuration file could not be read or rewritten.
    #[display("could not update device configuration {}", _0.display())]
    Config(#[error(not(source))] PathBuf),
    #[display("unknown device model: {_0}")]
    UnknownModel(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
