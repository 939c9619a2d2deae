//! Remote Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! A missing document is *not* an error: [`fetch`](crate::DocumentRemote::fetch)
//! returns `Ok(None)` for that, since a brand new note has no cloud copy yet.

use derive_more::{Display, Error};

/// A remote error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Base URL could not be parsed or joined
    #[display("invalid endpoint URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Could not reach the endpoint (DNS, connection, timeout)
    #[display("transport error")]
    Transport,
    /// The endpoint answered with a non-success status
    #[display("unexpected status {_0}")]
    Status(#[error(not(source))] u16),
    /// The endpoint answered, but the body was not what was promised
    #[display("invalid response body")]
    InvalidResponse,
    /// Summarisation was refused or failed; carries the message to display
    #[display("{_0}")]
    Summary(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport | Self::BackendError(_) => true,
            Self::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Transport, true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(400), false)]
    #[case(ErrorKind::InvalidResponse, false)]
    #[case(ErrorKind::InvalidUrl("nope".to_string()), false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
