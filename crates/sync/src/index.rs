//! The note listing that sits beside the editor.

use scribe_remote::DocumentId;
use std::sync::Arc;

pub type IndexHandle = Arc<dyn NoteIndex + Send + Sync>;

/// Listing of notes, each shown by its first line.
///
/// Autosave consults it before every save: when the first line of the text
/// being saved no longer matches what the listing shows, the listing is
/// asked to refresh itself.
pub trait NoteIndex: Send + Sync {
    /// First line of the document as currently shown, if listed.
    fn first_line(&self, id: &DocumentId) -> Option<String>;

    /// Ask the listing to reload. Must return promptly.
    fn revalidate(&self, id: &DocumentId);
}

/// A listing that shows nothing and ignores refresh requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndex;

impl NoteIndex for NoIndex {
    fn first_line(&self, _id: &DocumentId) -> Option<String> {
        None
    }

    fn revalidate(&self, _id: &DocumentId) {}
}

/// First line of plain text, as the listing would show it.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "")]
    #[case("Title", "Title")]
    #[case("Title\nbody", "Title")]
    #[case("Title\r\nbody", "Title")]
    #[case("\nbody", "")]
    fn test_first_line(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(first_line(text), expected);
    }
}
