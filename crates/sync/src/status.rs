//! Save status shown next to the editor.
//!
//! [`SaveState`] is a plain value with pure transitions; the autosave worker
//! drives it and publishes every change. Keeping it free of I/O means the
//! edit-during-save rules can be tested without a runtime.

use derive_more::Display;
use time::macros::format_description;
use time::{UtcDateTime, UtcOffset};

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum SaveStatus {
    /// Everything the editor holds has reached the remote.
    #[default]
    #[display("Saved")]
    Saved,
    #[display("Unsaved")]
    Unsaved,
    #[display("Saving...")]
    Saving,
    /// The last save attempt failed; the next edit schedules another one.
    #[display("Save failed")]
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveState {
    status: SaveStatus,
    edited_while_saving: bool,
    last_saved: Option<UtcDateTime>,
    message: Option<String>,
}

impl SaveState {
    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// When a save last succeeded for this document.
    pub fn last_saved(&self) -> Option<UtcDateTime> {
        self.last_saved
    }

    /// Text for the status indicator.
    ///
    /// After a successful save the remote's own response text is shown
    /// instead of the generic label.
    pub fn label(&self) -> String {
        match (&self.status, &self.message) {
            (SaveStatus::Saved, Some(message)) if !message.is_empty() => message.clone(),
            (status, _) => status.to_string(),
        }
    }

    /// Time of the last successful save as `HH:MM` in the given offset.
    pub fn last_saved_label(&self, offset: UtcOffset) -> Option<String> {
        let format = format_description!("[hour]:[minute]");
        self.last_saved.and_then(|at| at.to_offset(offset).format(&format).ok())
    }

    /// The user changed the document.
    pub fn edited(&mut self) {
        self.message = None;
        if self.status == SaveStatus::Saving {
            self.edited_while_saving = true;
        } else {
            self.status = SaveStatus::Unsaved;
        }
    }

    /// Newer content is waiting behind the save in flight.
    ///
    /// Unlike [`edited`](Self::edited) this leaves an idle document alone:
    /// the queued content gets its own save either way.
    pub fn queued(&mut self) {
        if self.status == SaveStatus::Saving {
            self.edited_while_saving = true;
            self.message = None;
        }
    }

    /// A save request was sent.
    pub fn saving(&mut self) {
        self.status = SaveStatus::Saving;
        self.edited_while_saving = false;
        self.message = None;
    }

    /// The in-flight save succeeded.
    ///
    /// Edits made while it was in flight were not part of it, so the
    /// document stays `Unsaved` in that case.
    pub fn saved(&mut self, at: UtcDateTime, message: String) {
        self.last_saved = Some(at);
        if std::mem::take(&mut self.edited_while_saving) {
            self.status = SaveStatus::Unsaved;
            self.message = None;
        } else {
            self.status = SaveStatus::Saved;
            self.message = Some(message);
        }
    }

    /// The in-flight save failed.
    pub fn failed(&mut self) {
        self.status = SaveStatus::Failed;
        self.edited_while_saving = false;
        self.message = None;
    }
}
