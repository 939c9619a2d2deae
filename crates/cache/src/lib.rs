//! Local cache of document content.
//!
//! This crate keeps the last-known serialized content of each document on
//! the device, keyed by document identifier. It is written only when a
//! document is reconciled with its remote copy (adopting the remote version,
//! or the user choosing the cloud version in a conflict), never per
//! keystroke. Nothing in here interprets the content it stores.
//!
//! [`Repository`] is the SQLite-backed implementation of [`DocumentCache`];
//! the `mock` feature adds an in-memory `MemoryCache` for other crates' tests.

mod db;
pub mod error;
#[cfg(feature = "mock")]
mod memory;
mod models;
mod repo;

pub use crate::db::Database;
#[cfg(feature = "mock")]
pub use crate::memory::MemoryCache;
pub use crate::models::CacheEntry;
pub use crate::repo::Repository;
use crate::error::Result;
use async_trait::async_trait;
use scribe_remote::DocumentId;
use std::sync::Arc;

pub type CacheHandle = Arc<dyn DocumentCache + Send + Sync>;

/// Key/value persistence of each document's last-known serialized form.
///
/// One entry per identifier; writing an identifier that already has an
/// entry overwrites it in place.
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// Get the cached entry for a document, if any.
    async fn get(&self, id: &DocumentId) -> Result<Option<CacheEntry>>;

    /// Store the serialized content of a document, replacing any previous entry.
    async fn put(&self, id: &DocumentId, content: &str) -> Result<CacheEntry>;

    /// Remove a document from the cache. Returns whether anything was removed.
    async fn delete(&self, id: &DocumentId) -> Result<bool>;
}
