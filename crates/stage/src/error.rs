//! Staging Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A staging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for staging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a staging failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Transformation`]
/// - [`ErrorKind::Template`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Container`]
/// - [`ErrorKind::Commit`]
/// - [`ErrorKind::Copy`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The packaged document could not be opened or inspected.
    #[display("container could not be read")]
    Container,
    /// Metadata injection or the markup transformer failed.
    #[display("transformation failed")]
    Transformation,
    /// The transformed container could not be written back.
    #[display("could not commit container")]
    Commit,
    /// The converted-book copy could not be written.
    #[display("could not copy book to {}", _0.display())]
    Copy(#[error(not(source))] PathBuf),
    /// The [`CopyPathGenerator`](crate::CopyPathGenerator) could not render a path.
    #[display("issue with path generation from template")]
    Template,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Commit | Self::Copy(_))
    }
}
