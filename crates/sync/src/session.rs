//! The editing session: one open document at a time.
//!
//! Opening a document advances the session [`Epoch`], cancels a load that is
//! still running for the previous one, and retires its autosave worker (which
//! still saves whatever was pending). Status and metrics are published on
//! channels that outlive individual documents; anything the previous
//! document's work tries to publish after the switch is discarded.
//!
//! A retired worker is remembered by document. Reopening that document waits
//! for it first, so its last save lands before the reload reads the remote
//! and two saves for one document never overlap.

use crate::autosave::{AutosaveController, AutosaveOptions, EditorEvent, Published, Snapshot};
use crate::coordinator::{ConflictState, LoadOutcome, SyncCoordinator};
use crate::epoch::Epoch;
use crate::error::{ErrorKind, Result};
use crate::index::IndexHandle;
use crate::status::SaveState;
use exn::{OptionExt, ResultExt};
use scribe_cache::CacheHandle;
use scribe_metrics::Metrics;
use scribe_remote::{Content, DocumentId, RemoteHandle};
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Result of [`Session::open`].
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    Ready(LoadOutcome),
    /// Another document was opened before this one finished loading.
    Superseded,
}

struct Active {
    outcome: LoadOutcome,
    autosave: AutosaveController,
}

pub struct Session {
    coordinator: SyncCoordinator,
    cache: CacheHandle,
    remote: RemoteHandle,
    index: IndexHandle,
    options: AutosaveOptions,
    epoch: Epoch,
    status: Arc<watch::Sender<SaveState>>,
    metrics: Arc<watch::Sender<Metrics>>,
    loading: std::sync::Mutex<Option<CancellationToken>>,
    active: Mutex<Option<Active>>,
    retired: std::sync::Mutex<HashMap<DocumentId, Vec<JoinHandle<()>>>>,
}

impl Session {
    pub fn new(remote: RemoteHandle, cache: CacheHandle, index: IndexHandle, options: AutosaveOptions) -> Self {
        Self {
            coordinator: SyncCoordinator::new(remote.clone(), cache.clone()),
            cache,
            remote,
            index,
            options,
            epoch: Epoch::new(),
            status: Arc::new(watch::Sender::new(SaveState::default())),
            metrics: Arc::new(watch::Sender::new(Metrics::default())),
            loading: std::sync::Mutex::new(None),
            active: Mutex::new(None),
            retired: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Save status of whichever document is open.
    pub fn status(&self) -> watch::Receiver<SaveState> {
        self.status.subscribe()
    }

    /// Metrics of whichever document is open.
    pub fn metrics(&self) -> watch::Receiver<Metrics> {
        self.metrics.subscribe()
    }

    /// Open a document, replacing the current one.
    #[instrument(skip(self, id), fields(document = %id))]
    pub async fn open(&self, id: DocumentId) -> Opened {
        let ticket = self.epoch.advance();
        let token = CancellationToken::new();
        let previous = self
            .loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        if let Some(previous) = self.active.lock().await.take() {
            debug!(previous = %previous.outcome.id, "closing previous document");
            self.retire(previous);
        }
        self.status.send_replace(SaveState::default());
        self.metrics.send_replace(Metrics::default());
        self.wait_for_retired(&id).await;

        let outcome = tokio::select! {
            () = token.cancelled() => None,
            outcome = self.coordinator.load(&id) => Some(outcome),
        };
        let Some(outcome) = outcome.filter(|_| ticket.is_current()) else {
            debug!("superseded while loading");
            return Opened::Superseded;
        };

        let mut active = self.active.lock().await;
        if !ticket.is_current() {
            debug!("superseded while loading");
            return Opened::Superseded;
        }
        let published = Published::new(ticket, self.status.clone(), self.metrics.clone());
        published.metrics(Metrics::compute(&outcome.working.plain_text()));
        let writable = !outcome.conflict.is_pending();
        let autosave = AutosaveController::spawn(
            id,
            self.remote.clone(),
            self.index.clone(),
            published,
            self.options,
            writable,
        );
        info!(origin = %outcome.origin, writable, "document open");
        *active = Some(Active {
            outcome: outcome.clone(),
            autosave,
        });
        Opened::Ready(outcome)
    }

    /// The open document, if any.
    pub async fn current(&self) -> Option<LoadOutcome> {
        self.active.lock().await.as_ref().map(|active| active.outcome.clone())
    }

    pub async fn conflict(&self) -> Option<ConflictState> {
        self.active.lock().await.as_ref().map(|active| active.outcome.conflict.clone())
    }

    /// Resolve the pending conflict with the cached copy and allow saving.
    pub async fn keep_local(&self) -> Result<Content> {
        let mut active = self.active.lock().await;
        let active = active.as_mut().ok_or_raise(|| ErrorKind::NoDocument)?;
        self.coordinator.keep_local(&mut active.outcome)?;
        active.autosave.allow_writes()?;
        Ok(active.outcome.working.clone())
    }

    /// Resolve the pending conflict with the remote copy and allow saving.
    ///
    /// Returns the content the editor should now show.
    pub async fn keep_cloud(&self) -> Result<Content> {
        let mut active = self.active.lock().await;
        let active = active.as_mut().ok_or_raise(|| ErrorKind::NoDocument)?;
        self.coordinator.keep_cloud(&mut active.outcome).await?;
        active.autosave.publish_metrics(&active.outcome.working.plain_text());
        active.autosave.allow_writes()?;
        Ok(active.outcome.working.clone())
    }

    pub async fn handle(&self, event: EditorEvent) -> Result<()> {
        self.autosave(|autosave| autosave.handle(event)).await
    }

    pub async fn update(&self, snapshot: Snapshot) -> Result<()> {
        self.autosave(|autosave| autosave.update(snapshot)).await
    }

    pub async fn debounced_update(&self, snapshot: Snapshot) -> Result<()> {
        self.autosave(|autosave| autosave.debounced_update(snapshot)).await
    }

    /// Save pending edits of the open document now and wait for the result.
    pub async fn flush(&self) -> Result<()> {
        let done = self.autosave(AutosaveController::request_flush).await?;
        done.await.map_err(|_| ErrorKind::Closed)?;
        Ok(())
    }

    /// Keep the editor's copy of the open document on this device.
    ///
    /// Autosave only ever talks to the remote; the editor calls this for
    /// its own local persistence so the next load finds both copies equal.
    pub async fn store_local(&self, content: &Content) -> Result<()> {
        let mut active = self.active.lock().await;
        let active = active.as_mut().ok_or_raise(|| ErrorKind::NoDocument)?;
        self.cache
            .put(&active.outcome.id, &content.to_serialized())
            .await
            .or_raise(|| ErrorKind::Cache)?;
        active.outcome.working = content.clone();
        Ok(())
    }

    /// Close the open document, saving anything pending first, and wait
    /// for every retired worker to finish.
    pub async fn close(&self) {
        if let Some(token) = self.loading.lock().unwrap_or_else(PoisonError::into_inner).take() {
            token.cancel();
        }
        let active = self.active.lock().await.take();
        if let Some(active) = active {
            debug!(document = %active.outcome.id, "closing document");
            active.autosave.shutdown().await;
        }
        let retired: Vec<_> = self.retired().drain().flat_map(|(_, workers)| workers).collect();
        for worker in retired {
            join(worker).await;
        }
    }

    fn retire(&self, previous: Active) {
        let worker = previous.autosave.retire();
        let mut retired = self.retired();
        retired.retain(|_, workers| {
            workers.retain(|worker| !worker.is_finished());
            !workers.is_empty()
        });
        retired.entry(previous.outcome.id).or_default().push(worker);
    }

    async fn wait_for_retired(&self, id: &DocumentId) {
        let workers = self.retired().remove(id).unwrap_or_default();
        if !workers.is_empty() {
            debug!("waiting for the previous save of this document");
        }
        for worker in workers {
            join(worker).await;
        }
    }

    fn retired(&self) -> MutexGuard<'_, HashMap<DocumentId, Vec<JoinHandle<()>>>> {
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn autosave<T>(&self, f: impl FnOnce(&AutosaveController) -> Result<T>) -> Result<T> {
        let active = self.active.lock().await;
        let active = active.as_ref().ok_or_raise(|| ErrorKind::NoDocument)?;
        f(&active.autosave)
    }
}

async fn join(worker: JoinHandle<()>) {
    if let Err(err) = worker.await {
        warn!(error = %err, "retired autosave worker did not finish cleanly");
    }
}
