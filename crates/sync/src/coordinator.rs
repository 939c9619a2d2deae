//! Reconciling the cached copy of a document with the remote one.
//!
//! Loading a document reads both copies and applies one decision table:
//!
//! | cached | remote | result                                          |
//! |--------|--------|-------------------------------------------------|
//! | none   | none   | empty document                                  |
//! | none   | some   | adopt remote, write it to the cache             |
//! | some   | none   | keep cached                                     |
//! | equal  | equal  | keep cached                                     |
//! | some   | some   | keep cached for now, conflict pending           |
//!
//! Copies are compared as parsed JSON values, so key order and whitespace in
//! the cached text never cause a conflict on their own.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use scribe_cache::CacheHandle;
use scribe_remote::{Content, DocumentId, RemoteHandle};
use tracing::{info, instrument, warn};

/// Whether the two copies of a document disagree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ConflictState {
    #[default]
    Clear,
    /// Both copies exist and differ; the user must pick one.
    Pending { local: Content, remote: Content },
}
impl ConflictState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Where the working content came from.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Origin {
    #[display("empty")]
    Empty,
    #[display("cache")]
    Local,
    #[display("remote")]
    Remote,
}

/// A loaded document, ready to hand to the editor.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOutcome {
    pub id: DocumentId,
    /// Content the editor should show.
    pub working: Content,
    pub origin: Origin,
    pub conflict: ConflictState,
}

#[derive(Debug, PartialEq)]
enum Decision {
    Empty,
    AdoptRemote(Content),
    KeepLocal(Content),
    Conflict { local: Content, remote: Content },
}

fn reconcile(local: Option<Content>, remote: Option<Content>) -> Decision {
    match (local, remote) {
        (None, None) => Decision::Empty,
        (None, Some(remote)) => Decision::AdoptRemote(remote),
        (Some(local), None) => Decision::KeepLocal(local),
        (Some(local), Some(remote)) if local == remote => Decision::KeepLocal(local),
        (Some(local), Some(remote)) => Decision::Conflict { local, remote },
    }
}

pub struct SyncCoordinator {
    remote: RemoteHandle,
    cache: CacheHandle,
}

impl SyncCoordinator {
    pub fn new(remote: RemoteHandle, cache: CacheHandle) -> Self {
        Self { remote, cache }
    }

    /// Load a document from both copies.
    ///
    /// Never fails: an unreachable remote is treated as having no copy, and
    /// an unreadable cache entry as absent. Both are logged.
    #[instrument(skip(self), fields(document = %id))]
    pub async fn load(&self, id: &DocumentId) -> LoadOutcome {
        let remote = match self.remote.fetch(id).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(remote = self.remote.name(), error = ?err, "remote copy unavailable, continuing without it");
                None
            },
        };
        let local = self.read_local(id).await;
        let (working, origin, conflict) = match reconcile(local, remote) {
            Decision::Empty => (Content::default(), Origin::Empty, ConflictState::Clear),
            Decision::AdoptRemote(remote) => {
                if let Err(err) = self.cache.put(id, &remote.to_serialized()).await {
                    warn!(error = ?err, "could not cache remote copy");
                }
                (remote, Origin::Remote, ConflictState::Clear)
            },
            Decision::KeepLocal(local) => (local, Origin::Local, ConflictState::Clear),
            Decision::Conflict { local, remote } => {
                info!("cached and remote copies differ");
                let conflict = ConflictState::Pending {
                    local: local.clone(),
                    remote,
                };
                (local, Origin::Local, conflict)
            },
        };
        info!(%origin, conflict = conflict.is_pending(), "document loaded");
        LoadOutcome {
            id: id.clone(),
            working,
            origin,
            conflict,
        }
    }

    async fn read_local(&self, id: &DocumentId) -> Option<Content> {
        let entry = match self.cache.get(id).await {
            Ok(entry) => entry?,
            Err(err) => {
                warn!(error = ?err, "could not read cached copy");
                return None;
            },
        };
        match Content::from_serialized(&entry.content) {
            Ok(content) => Some(content),
            Err(err) => {
                warn!(error = %err, "cached copy is not valid JSON, ignoring it");
                None
            },
        }
    }

    /// Resolve a pending conflict in favour of the cached copy.
    ///
    /// The cache already holds that copy, so nothing is written.
    pub fn keep_local(&self, outcome: &mut LoadOutcome) -> Result<()> {
        let ConflictState::Pending { local, .. } = std::mem::take(&mut outcome.conflict) else {
            exn::bail!(ErrorKind::NoConflict);
        };
        info!(document = %outcome.id, "conflict resolved, keeping cached copy");
        outcome.working = local;
        outcome.origin = Origin::Local;
        Ok(())
    }

    /// Resolve a pending conflict in favour of the remote copy.
    ///
    /// The remote copy is written to the cache first; if that fails the
    /// conflict stays pending.
    pub async fn keep_cloud(&self, outcome: &mut LoadOutcome) -> Result<()> {
        let ConflictState::Pending { remote, .. } = &outcome.conflict else {
            exn::bail!(ErrorKind::NoConflict);
        };
        let remote = remote.clone();
        self.cache
            .put(&outcome.id, &remote.to_serialized())
            .await
            .or_raise(|| ErrorKind::Cache)?;
        info!(document = %outcome.id, "conflict resolved, keeping remote copy");
        outcome.working = remote;
        outcome.origin = Origin::Remote;
        outcome.conflict = ConflictState::Clear;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_cache::{DocumentCache, MemoryCache, Repository};
    use scribe_remote::MockRemote;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(text: &str) -> Content {
        Content::new(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": text}]}],
        }))
    }

    fn setup(
        cached: Option<&Content>,
        remote: Option<&Content>,
    ) -> (SyncCoordinator, Arc<MemoryCache>, Arc<MockRemote>) {
        let cache = Arc::new(match cached {
            Some(content) => MemoryCache::with_entries([("note", content.to_serialized())]),
            None => MemoryCache::default(),
        });
        let remote = Arc::new(match remote {
            Some(content) => MockRemote::with_documents([("note", content.clone())]),
            None => MockRemote::default(),
        });
        let coordinator = SyncCoordinator::new(remote.clone(), cache.clone());
        (coordinator, cache, remote)
    }

    fn id() -> DocumentId {
        DocumentId::from("note")
    }

    #[test]
    fn test_reconcile_table() {
        let (a, b) = (doc("a"), doc("b"));
        assert_eq!(reconcile(None, None), Decision::Empty);
        assert_eq!(reconcile(None, Some(a.clone())), Decision::AdoptRemote(a.clone()));
        assert_eq!(reconcile(Some(a.clone()), None), Decision::KeepLocal(a.clone()));
        assert_eq!(reconcile(Some(a.clone()), Some(a.clone())), Decision::KeepLocal(a.clone()));
        assert_eq!(
            reconcile(Some(a.clone()), Some(b.clone())),
            Decision::Conflict { local: a, remote: b }
        );
    }

    #[test]
    fn test_reconcile_ignores_key_order() {
        let local = Content::from_serialized(r#"{"type":"doc","content":[]}"#).unwrap();
        let remote = Content::from_serialized(r#"{ "content": [], "type": "doc" }"#).unwrap();
        assert!(matches!(reconcile(Some(local), Some(remote)), Decision::KeepLocal(_)));
    }

    #[tokio::test]
    async fn test_load_nothing_anywhere() {
        let (coordinator, cache, _) = setup(None, None);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, Content::default());
        assert_eq!(outcome.origin, Origin::Empty);
        assert_eq!(outcome.conflict, ConflictState::Clear);
        assert_eq!(cache.content(&id()), None);
    }

    #[tokio::test]
    async fn test_load_adopts_and_caches_remote() {
        let remote = doc("from the cloud");
        let (coordinator, cache, _) = setup(None, Some(&remote));
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, remote);
        assert_eq!(outcome.origin, Origin::Remote);
        assert_eq!(cache.content(&id()), Some(remote.to_serialized()));
    }

    #[tokio::test]
    async fn test_load_keeps_local_without_remote() {
        let local = doc("offline draft");
        let (coordinator, _, _) = setup(Some(&local), None);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, local);
        assert_eq!(outcome.origin, Origin::Local);
        assert!(!outcome.conflict.is_pending());
    }

    #[tokio::test]
    async fn test_load_identical_copies() {
        let content = doc("same");
        let (coordinator, _, _) = setup(Some(&content), Some(&content));
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, content);
        assert_eq!(outcome.conflict, ConflictState::Clear);
    }

    #[tokio::test]
    async fn test_load_differing_copies_conflict() {
        let (local, remote) = (doc("mine"), doc("theirs"));
        let (coordinator, cache, _) = setup(Some(&local), Some(&remote));
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, local);
        assert_eq!(
            outcome.conflict,
            ConflictState::Pending {
                local: local.clone(),
                remote,
            }
        );
        assert_eq!(cache.content(&id()), Some(local.to_serialized()));
    }

    #[tokio::test]
    async fn test_fetch_failure_behaves_like_missing_remote() {
        let local = doc("offline draft");
        let (coordinator, _, remote) = setup(Some(&local), Some(&doc("unreachable")));
        remote.fail_fetches(true);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, local);
        assert!(!outcome.conflict.is_pending());

        let (coordinator, _, remote) = setup(None, Some(&doc("unreachable")));
        remote.fail_fetches(true);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.origin, Origin::Empty);
    }

    #[tokio::test]
    async fn test_unparseable_cache_entry_is_ignored() {
        let remote = doc("theirs");
        let cache = Arc::new(MemoryCache::with_entries([("note", "{ not json")]));
        let coordinator = SyncCoordinator::new(Arc::new(MockRemote::with_documents([("note", remote.clone())])), cache);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, remote);
        assert!(!outcome.conflict.is_pending());
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_load() {
        let remote = doc("theirs");
        let (coordinator, cache, _) = setup(None, Some(&remote));
        cache.fail_writes(true);
        let outcome = coordinator.load(&id()).await;
        assert_eq!(outcome.working, remote);
        assert_eq!(cache.content(&id()), None);
    }

    #[tokio::test]
    async fn test_keep_local() {
        let (local, remote) = (doc("mine"), doc("theirs"));
        let (coordinator, cache, _) = setup(Some(&local), Some(&remote));
        let mut outcome = coordinator.load(&id()).await;
        coordinator.keep_local(&mut outcome).unwrap();
        assert_eq!(outcome.working, local);
        assert_eq!(outcome.conflict, ConflictState::Clear);
        assert_eq!(cache.content(&id()), Some(local.to_serialized()));
    }

    #[tokio::test]
    async fn test_keep_cloud() {
        let (local, remote) = (doc("mine"), doc("theirs"));
        let (coordinator, cache, _) = setup(Some(&local), Some(&remote));
        let mut outcome = coordinator.load(&id()).await;
        coordinator.keep_cloud(&mut outcome).await.unwrap();
        assert_eq!(outcome.working, remote);
        assert_eq!(outcome.origin, Origin::Remote);
        assert_eq!(outcome.conflict, ConflictState::Clear);
        assert_eq!(cache.content(&id()), Some(remote.to_serialized()));
    }

    #[tokio::test]
    async fn test_keep_cloud_cache_failure_leaves_conflict_pending() {
        let (local, remote) = (doc("mine"), doc("theirs"));
        let (coordinator, cache, _) = setup(Some(&local), Some(&remote));
        let mut outcome = coordinator.load(&id()).await;
        cache.fail_writes(true);
        let err = coordinator.keep_cloud(&mut outcome).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Cache));
        assert!(outcome.conflict.is_pending());
        assert_eq!(outcome.working, local);
    }

    #[tokio::test]
    async fn test_resolving_without_conflict() {
        let (coordinator, _, _) = setup(None, None);
        let mut outcome = coordinator.load(&id()).await;
        let err = coordinator.keep_local(&mut outcome).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoConflict));
        let err = coordinator.keep_cloud(&mut outcome).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoConflict));
        assert_eq!(outcome.origin, Origin::Empty);
    }

    #[tokio::test]
    async fn test_load_with_sqlite_cache() {
        let db = scribe_cache::Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let remote = doc("theirs");
        let coordinator = SyncCoordinator::new(
            Arc::new(MockRemote::with_documents([("note", remote.clone())])),
            Arc::new(repo.clone()),
        );
        coordinator.load(&id()).await;
        let entry = repo.get(&id()).await.unwrap().unwrap();
        assert_eq!(entry.content, remote.to_serialized());
    }
}
