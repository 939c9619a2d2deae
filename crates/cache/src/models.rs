use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use scribe_remote::DocumentId;
use time::UtcDateTime;

/// The last-known serialized form of one document.
///
/// Content is kept exactly as it was written so that comparisons against
/// the remote copy are byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub document_id: DocumentId,
    pub content: String,
    pub updated_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) updated_at: i64,
}
impl TryFrom<EntryRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            document_id: DocumentId::new(row.id),
            content: row.content,
            updated_at: UtcDateTime::from_unix_timestamp(row.updated_at)
                .or_raise(|| ErrorKind::InvalidData("updated at"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let now = UtcDateTime::now();
        let row = EntryRow {
            id: "note-1".to_string(),
            content: r#"{"type":"doc"}"#.to_string(),
            updated_at: now.unix_timestamp(),
        };
        let entry = CacheEntry::try_from(row).unwrap();
        assert_eq!(entry.document_id, DocumentId::from("note-1"));
        // Converting to a Unix timestamp (measured in seconds) inherently strips the nanoseconds component.
        assert_eq!(entry.updated_at, now.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_row_with_impossible_timestamp() {
        let row = EntryRow {
            id: "note-1".to_string(),
            content: String::new(),
            updated_at: i64::MAX,
        };
        let err = CacheEntry::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(_)));
    }
}
