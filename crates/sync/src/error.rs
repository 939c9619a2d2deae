//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Network failures never show up here: a failed fetch degrades to "no cloud
//! copy" and a failed save becomes [`SaveStatus::Failed`](crate::SaveStatus::Failed).
//! What remains are caller mistakes and local cache trouble.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Open a document first
    #[display("no document is open")]
    NoDocument,
    /// Conflict resolution was requested but nothing is pending
    #[display("no conflict is pending")]
    NoConflict,
    /// The local cache could not be written
    #[display("local cache error")]
    Cache,
    /// The autosave worker is gone (the document was closed)
    #[display("autosave has stopped")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache)
    }
}
