//! Debounced autosave of the open document.
//!
//! An [`AutosaveController`] is a cheap handle in front of a single worker
//! task. Editor events become commands on an unbounded channel; the worker
//! owns all mutable state, so there is nothing to lock and at most one save
//! is ever in flight. Commands that arrive while a save is running wait in
//! the channel and are applied once it completes.
//!
//! Writes stay blocked until the owner allows them. A [`Session`](crate::Session)
//! does that once the document has loaded and any conflict is resolved, so
//! an edit can never overwrite the remote copy before the user has chosen.

use crate::epoch::{Epoch, Ticket};
use crate::error::{ErrorKind, Result};
use crate::index::{IndexHandle, NoIndex, first_line};
use crate::status::{SaveState, SaveStatus};
use scribe_metrics::Metrics;
use scribe_remote::{Content, DocumentId, RemoteHandle};
use std::sync::Arc;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveOptions {
    /// Quiet period after the last edit before a save is sent.
    pub debounce: Duration,
}
impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// The editor's current document, in both forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub text: String,
    pub content: Content,
}
impl Snapshot {
    pub fn new(text: impl Into<String>, content: Content) -> Self {
        Self {
            text: text.into(),
            content,
        }
    }
}

/// What the editor reports.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Fired on every change.
    Update(Snapshot),
    /// Fired by the editor's own debouncer once typing settles.
    DebouncedUpdate(Snapshot),
}

/// Status and metrics channels, guarded by the ticket of the document they
/// were created for. Once the ticket goes stale every write is dropped.
#[derive(Clone)]
pub(crate) struct Published {
    ticket: Ticket,
    status: Arc<watch::Sender<SaveState>>,
    metrics: Arc<watch::Sender<Metrics>>,
}
impl Published {
    pub(crate) fn new(
        ticket: Ticket,
        status: Arc<watch::Sender<SaveState>>,
        metrics: Arc<watch::Sender<Metrics>>,
    ) -> Self {
        Self { ticket, status, metrics }
    }

    /// Apply a transition to the published status. Returns whether it applied.
    pub(crate) fn status(&self, transition: impl FnOnce(&mut SaveState)) -> bool {
        let applied = self.status.send_if_modified(|state| {
            if !self.ticket.is_current() {
                return false;
            }
            transition(state);
            true
        });
        if !applied {
            debug!("dropping status update for a document that is no longer open");
        }
        applied
    }

    pub(crate) fn metrics(&self, metrics: Metrics) -> bool {
        self.metrics.send_if_modified(|current| {
            if !self.ticket.is_current() {
                return false;
            }
            *current = metrics;
            true
        })
    }
}

#[derive(Debug)]
enum Command {
    Edit { snapshot: Snapshot, at: Instant },
    Debounced(Snapshot),
    AllowWrites,
    Flush(oneshot::Sender<()>),
}

pub struct AutosaveController {
    id: DocumentId,
    commands: mpsc::UnboundedSender<Command>,
    published: Published,
    worker: JoinHandle<()>,
}

impl AutosaveController {
    /// Start autosaving a document on its own, with writes allowed at once.
    pub fn new(id: DocumentId, remote: RemoteHandle, options: AutosaveOptions) -> Self {
        let published = Published::new(
            Epoch::new().advance(),
            Arc::new(watch::Sender::new(SaveState::default())),
            Arc::new(watch::Sender::new(Metrics::default())),
        );
        Self::spawn(id, remote, Arc::new(NoIndex), published, options, true)
    }

    pub(crate) fn spawn(
        id: DocumentId,
        remote: RemoteHandle,
        index: IndexHandle,
        published: Published,
        options: AutosaveOptions,
        writable: bool,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = Worker {
            id: id.clone(),
            remote,
            index,
            published: published.clone(),
            debounce: options.debounce,
            commands: receiver,
            writable,
            pending: None,
            due: None,
            last_saved: None,
            flushes: Vec::new(),
        };
        let worker = tokio::spawn(worker.run());
        Self {
            id,
            commands,
            published,
            worker,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn status(&self) -> watch::Receiver<SaveState> {
        self.published.status.subscribe()
    }

    pub fn metrics(&self) -> watch::Receiver<Metrics> {
        self.published.metrics.subscribe()
    }

    pub fn handle(&self, event: EditorEvent) -> Result<()> {
        match event {
            EditorEvent::Update(snapshot) => self.update(snapshot),
            EditorEvent::DebouncedUpdate(snapshot) => self.debounced_update(snapshot),
        }
    }

    /// The document changed: mark it unsaved, refresh the metrics, and
    /// (re)start the quiet-period timer.
    pub fn update(&self, snapshot: Snapshot) -> Result<()> {
        self.published.status(SaveState::edited);
        self.publish_metrics(&snapshot.text);
        self.send(Command::Edit {
            snapshot,
            at: Instant::now(),
        })
    }

    /// The editor's own debouncer fired: save as soon as nothing else is in
    /// flight, unless this content has already been saved.
    pub fn debounced_update(&self, snapshot: Snapshot) -> Result<()> {
        self.published.status(SaveState::queued);
        self.send(Command::Debounced(snapshot))
    }

    pub(crate) fn allow_writes(&self) -> Result<()> {
        self.send(Command::AllowWrites)
    }

    pub(crate) fn publish_metrics(&self, text: &str) {
        self.published.metrics(Metrics::compute(text));
    }

    /// Ask for pending edits to be saved now. The receiver resolves once
    /// nothing is pending any more, or right away if writes are blocked.
    pub(crate) fn request_flush(&self) -> Result<oneshot::Receiver<()>> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        Ok(done)
    }

    /// Save pending edits now and wait for the result.
    pub async fn flush(&self) -> Result<()> {
        self.request_flush()?.await.map_err(|_| ErrorKind::Closed)?;
        Ok(())
    }

    /// Stop accepting edits, save whatever is pending, and wait for the
    /// worker to finish.
    pub async fn shutdown(self) {
        let id = self.id.clone();
        if let Err(err) = self.retire().await {
            warn!(document = %id, error = %err, "autosave worker did not finish cleanly");
        }
    }

    /// Stop accepting edits and hand back the worker, which saves whatever
    /// is pending before it finishes.
    pub(crate) fn retire(self) -> JoinHandle<()> {
        drop(self.commands);
        self.worker
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| ErrorKind::Closed)?;
        Ok(())
    }
}

struct Worker {
    id: DocumentId,
    remote: RemoteHandle,
    index: IndexHandle,
    published: Published,
    debounce: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
    writable: bool,
    pending: Option<Snapshot>,
    due: Option<Instant>,
    /// Content of the last successful save.
    last_saved: Option<Content>,
    flushes: Vec<oneshot::Sender<()>>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let due = self.due.filter(|_| self.writable);
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                () = wait_until(due) => self.persist().await,
            }
        }
        if self.writable && self.pending.is_some() {
            debug!(document = %self.id, "saving pending edits before stopping");
            self.persist().await;
        }
        self.settle_flushes();
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Edit { snapshot, at } => {
                self.pending = Some(snapshot);
                self.due = Some(if self.flushes.is_empty() {
                    at + self.debounce
                } else {
                    Instant::now()
                });
            },
            Command::Debounced(snapshot) => {
                if self.is_saved(&snapshot.content) {
                    debug!(document = %self.id, "debounced content already saved");
                    return;
                }
                self.pending = Some(snapshot);
                self.due = Some(Instant::now());
            },
            Command::AllowWrites => {
                self.writable = true;
            },
            Command::Flush(reply) => {
                if self.writable && self.pending.is_some() {
                    self.due = Some(Instant::now());
                    self.flushes.push(reply);
                } else {
                    let _ = reply.send(());
                }
            },
        }
    }

    /// Whether `content` is exactly what the last save sent and nothing has
    /// been edited since.
    fn is_saved(&self, content: &Content) -> bool {
        self.pending.is_none()
            && self.last_saved.as_ref() == Some(content)
            && self.published.status.borrow().status() == SaveStatus::Saved
    }

    #[instrument(level = "debug", skip(self), fields(document = %self.id))]
    async fn persist(&mut self) {
        self.due = None;
        let Some(snapshot) = self.pending.take() else {
            return;
        };
        let line = first_line(&snapshot.text);
        if self.index.first_line(&self.id).as_deref() != Some(line) {
            debug!(first_line = line, "first line changed, refreshing listing");
            self.index.revalidate(&self.id);
        }
        self.published.status(SaveState::saving);
        match self.remote.save(&self.id, &snapshot.content).await {
            Ok(message) => {
                info!(remote = self.remote.name(), %message, "saved");
                self.published.status(|state| state.saved(UtcDateTime::now(), message));
                self.last_saved = Some(snapshot.content);
            },
            Err(err) => {
                warn!(remote = self.remote.name(), error = ?err, "save failed");
                self.last_saved = None;
                self.published.status(SaveState::failed);
            },
        }
        // Edits queued behind this save are still in the channel; only
        // flushes requested before them are satisfied here.
        self.settle_flushes();
    }

    fn settle_flushes(&mut self) {
        for reply in self.flushes.drain(..) {
            let _ = reply.send(());
        }
    }
}

async fn wait_until(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}
