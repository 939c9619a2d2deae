//! Keeping a document in step between the local cache and the remote.
//!
//! - [`SyncCoordinator`] loads a document from both copies and decides which
//!   one the editor gets, flagging a conflict when they disagree.
//! - [`AutosaveController`] turns editor events into debounced, strictly
//!   sequential saves and publishes a [`SaveState`] and [`Metrics`](scribe_metrics::Metrics).
//! - [`Session`] ties the two together for one open document at a time and
//!   makes sure nothing from a previously open document leaks into the
//!   current one.

mod autosave;
mod coordinator;
mod epoch;
pub mod error;
mod index;
mod session;
mod status;

pub use crate::autosave::{AutosaveController, AutosaveOptions, DEFAULT_DEBOUNCE, EditorEvent, Snapshot};
pub use crate::coordinator::{ConflictState, LoadOutcome, Origin, SyncCoordinator};
pub use crate::epoch::{Epoch, Ticket};
pub use crate::index::{IndexHandle, NoIndex, NoteIndex};
pub use crate::session::{Opened, Session};
pub use crate::status::{SaveState, SaveStatus};
