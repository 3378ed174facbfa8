//! Session Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A session error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a session failure.
///
/// The underlying [`kte_stage`], [`kte_device`] or [`kte_config`] error is
/// kept in the error tree.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The settings could not be loaded or are invalid.
    #[display("invalid driver settings")]
    Settings,
    /// A book could not be staged.
    #[display("could not stage book")]
    Stage,
    /// Preparing the device or updating its database failed.
    #[display("device upkeep failed")]
    Device,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
