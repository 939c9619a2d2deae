//! Remote document client trait and implementations.
//!
//! This module defines the [`DocumentRemote`] trait, the narrow client
//! contract to wherever notes are mirrored: fetch a document by identifier,
//! persist a document by identifier. The storage engine behind the endpoint
//! is none of our business.

mod http;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::HttpRemote;
#[cfg(feature = "mock")]
pub use self::mock::MockRemote;
use crate::error::Result;
use crate::models::{Content, DocumentId};
use async_trait::async_trait;

/// Unified interface for remote document stores.
///
/// # Examples
///
/// ```
/// use scribe_remote::{Content, DocumentId, DocumentRemote, error::Result};
///
/// async fn content_or_empty(remote: &dyn DocumentRemote, id: &DocumentId) -> Result<Content> {
///     Ok(remote.fetch(id).await?.unwrap_or_default())
/// }
/// ```
#[async_trait]
pub trait DocumentRemote: Send + Sync {
    /// Name of the configured remote (used for logging only).
    fn name(&self) -> &str;

    /// Fetch the remote copy of a document.
    ///
    /// Returns `Ok(None)` when the remote has never seen this identifier;
    /// that is an expected outcome for a new note, not an error. Anything
    /// else that goes wrong (transport, unexpected status, unparseable body)
    /// is an error.
    async fn fetch(&self, id: &DocumentId) -> Result<Option<Content>>;

    /// Persist a document, overwriting the remote copy.
    ///
    /// On success returns the endpoint's human-readable status text, which
    /// is displayed as-is.
    async fn save(&self, id: &DocumentId, content: &Content) -> Result<String>;
}
