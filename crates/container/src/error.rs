//! Container Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A container error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file is not a readable zip archive.
    #[display("unreadable container: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
    /// A file required by the packaging format is absent.
    #[display("missing container entry: {_0}")]
    MissingEntry(#[error(not(source))] String),
    /// An XML document inside the container could not be parsed.
    #[display("malformed XML in {_0}")]
    MalformedXml(#[error(not(source))] String),
    /// Writing the container back to disk failed.
    #[display("could not commit container to {}", _0.display())]
    Commit(#[error(not(source))] PathBuf),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Commit(_))
    }
}
