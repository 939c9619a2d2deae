//! Documents and the remote store they are mirrored to.
//!
//! The [`DocumentRemote`] trait is the whole client contract to the remote
//! endpoint: fetch by identifier (where "not found" is a normal answer) and
//! save by identifier. [`HttpRemote`] speaks the note API over HTTP; the
//! `mock` feature adds an in-memory `MockRemote` for other crates' tests.

pub mod error;
mod models;
pub mod remote;
mod summary;

#[cfg(feature = "mock")]
pub use crate::remote::MockRemote;
pub use crate::models::{Content, DocumentId};
pub use crate::remote::{DocumentRemote, HttpRemote};
pub use crate::summary::{NO_TEXT_PROVIDED, summary_or_message};
use std::sync::Arc;

pub type RemoteHandle = Arc<dyn DocumentRemote + Send + Sync>;
