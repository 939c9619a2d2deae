//! In-memory remote for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{Content, DocumentId};
use crate::remote::DocumentRemote;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// In-memory remote for testing.
///
/// Documents are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods operate on `&self`. On top of plain storage it records every save
/// request, can be told to fail, can be slowed down (to widen race windows
/// in tests), and tracks how many saves were ever in flight at once.
///
/// # Examples
///
/// ```
/// use scribe_remote::{Content, DocumentId, DocumentRemote, MockRemote};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = MockRemote::with_documents([("note-1", Content::default())]);
/// assert!(remote.fetch(&DocumentId::from("note-1")).await?.is_some());
/// assert!(remote.fetch(&DocumentId::from("note-2")).await?.is_none());
/// # Ok(())
/// # }
/// ```
pub struct MockRemote {
    name: String,
    documents: RwLock<HashMap<DocumentId, Content>>,
    saves: Mutex<Vec<(DocumentId, Content)>>,
    status_text: String,
    fail_fetches: AtomicBool,
    fail_saves: AtomicBool,
    fetch_delays: HashMap<DocumentId, Duration>,
    save_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRemote {
    /// Create a mock remote pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (impl Into<DocumentId>, Content)>) -> Self {
        Self {
            name: "mock".to_string(),
            documents: RwLock::new(documents.into_iter().map(|(id, content)| (id.into(), content)).collect()),
            saves: Mutex::new(Vec::new()),
            status_text: "Saved".to_string(),
            fail_fetches: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            fetch_delays: HashMap::new(),
            save_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Text answered by successful saves (defaults to `"Saved"`).
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Delay fetches of one document by `delay`.
    pub fn with_fetch_delay(mut self, id: impl Into<DocumentId>, delay: Duration) -> Self {
        self.fetch_delays.insert(id.into(), delay);
        self
    }

    /// Delay every save by `delay`.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Every save request received so far, successful or not, in order.
    pub async fn saves(&self) -> Vec<(DocumentId, Content)> {
        self.saves.lock().await.clone()
    }

    /// Highest number of saves that were ever in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Current remote copy of a document.
    pub async fn document(&self, id: &DocumentId) -> Option<Content> {
        self.documents.read().await.get(id).cloned()
    }
}
impl Default for MockRemote {
    fn default() -> Self {
        let documents: [(&str, Content); 0] = [];
        Self::with_documents(documents)
    }
}

#[async_trait]
impl DocumentRemote for MockRemote {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, id: &DocumentId) -> Result<Option<Content>> {
        if let Some(delay) = self.fetch_delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::BackendError("injected fetch failure".to_string()));
        }
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn save(&self, id: &DocumentId, content: &Content) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.saves.lock().await.push((id.clone(), content.clone()));
        if !self.save_delay.is_zero() {
            tokio::time::sleep(self.save_delay).await;
        }
        let result = if self.fail_saves.load(Ordering::SeqCst) {
            Err(exn::Exn::from(ErrorKind::BackendError("injected save failure".to_string())))
        } else {
            self.documents.write().await.insert(id.clone(), content.clone());
            Ok(self.status_text.clone())
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_then_fetch() {
        let remote = MockRemote::default();
        let id = DocumentId::from("a");
        let content = Content::new(json!({"type": "doc", "content": [{"type": "paragraph"}]}));
        assert_eq!(remote.save(&id, &content).await.unwrap(), "Saved");
        assert_eq!(remote.fetch(&id).await.unwrap(), Some(content.clone()));
        assert_eq!(remote.saves().await, vec![(id, content)]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = MockRemote::with_documents([("a", Content::default())]);
        let id = DocumentId::from("a");
        remote.fail_fetches(true);
        assert!(remote.fetch(&id).await.is_err());
        remote.fail_saves(true);
        assert!(remote.save(&id, &Content::default()).await.is_err());
        // The failed request is still recorded.
        assert_eq!(remote.saves().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracks_concurrent_saves() {
        let remote = MockRemote::default().with_save_delay(Duration::from_millis(50));
        let (a, b) = (DocumentId::from("a"), DocumentId::from("b"));
        let content = Content::default();
        let (left, right) = tokio::join!(remote.save(&a, &content), remote.save(&b, &content));
        assert!(left.is_ok() && right.is_ok());
        assert_eq!(remote.max_in_flight(), 2);
    }
}
