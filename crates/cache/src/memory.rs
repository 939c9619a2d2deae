//! In-memory document cache for testing.

use crate::DocumentCache;
use crate::error::{ErrorKind, Result};
use crate::models::CacheEntry;
use async_trait::async_trait;
use scribe_remote::DocumentId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::UtcDateTime;

/// In-memory document cache for testing.
///
/// Entries live in a `HashMap` behind a [`Mutex`] that is never held across
/// an `.await`. Writes can be made to fail to exercise degraded paths.
///
/// # Examples
///
/// ```
/// use scribe_cache::{DocumentCache, MemoryCache};
/// use scribe_remote::DocumentId;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = MemoryCache::with_entries([("note-1", r#"{"type":"doc"}"#)]);
/// assert!(cache.get(&DocumentId::from("note-1")).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<DocumentId, CacheEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryCache {
    /// Create a cache pre-populated with serialized entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<DocumentId>, impl Into<String>)>) -> Self {
        let now = UtcDateTime::now();
        let entries = entries
            .into_iter()
            .map(|(id, content)| {
                let document_id = id.into();
                let entry = CacheEntry {
                    document_id: document_id.clone(),
                    content: content.into(),
                    updated_at: now,
                };
                (document_id, entry)
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Serialized content currently cached for a document.
    pub fn content(&self, id: &DocumentId) -> Option<String> {
        self.lock().get(id).map(|entry| entry.content.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DocumentId, CacheEntry>> {
        // A panic while holding the lock can only come from a test that is
        // already failing; keep serving whatever state is there.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentCache for MemoryCache {
    async fn get(&self, id: &DocumentId) -> Result<Option<CacheEntry>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn put(&self, id: &DocumentId, content: &str) -> Result<CacheEntry> {
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Database);
        }
        let entry = CacheEntry {
            document_id: id.clone(),
            content: content.to_string(),
            updated_at: UtcDateTime::now(),
        };
        self.lock().insert(id.clone(), entry.clone());
        Ok(entry)
    }

    async fn delete(&self, id: &DocumentId) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Database);
        }
        Ok(self.lock().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let cache = MemoryCache::default();
        let id = DocumentId::from("a");
        cache.put(&id, "one").await.unwrap();
        cache.put(&id, "two").await.unwrap();
        assert_eq!(cache.content(&id).as_deref(), Some("two"));
        assert!(cache.delete(&id).await.unwrap());
        assert_eq!(cache.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failing_writes_leave_entries_untouched() {
        let cache = MemoryCache::with_entries([("a", "kept")]);
        cache.fail_writes(true);
        let id = DocumentId::from("a");
        let err = cache.put(&id, "lost").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
        assert_eq!(cache.content(&id).as_deref(), Some("kept"));
    }
}
