//! Repository for cached document entries.

use crate::error::{ErrorKind, Result};
use crate::models::{CacheEntry, EntryRow};
use crate::{Database, DocumentCache};
use async_trait::async_trait;
use exn::ResultExt;
use scribe_remote::DocumentId;
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::instrument;

/// Key/value access to the document cache, keyed by [`DocumentId`].
///
/// There is at most one entry per identifier; writing an identifier that is
/// already cached overwrites it in place.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// All cached entries, most recently written first.
    pub async fn list(&self) -> Result<Vec<CacheEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_documents.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CacheEntry::try_from).collect()
    }
}

#[async_trait]
impl DocumentCache for Repository {
    #[instrument(level = "trace", skip(self))]
    async fn get(&self, id: &DocumentId) -> Result<Option<CacheEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_document.sql"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CacheEntry::try_from).transpose()
    }

    #[instrument(level = "trace", skip(self, content))]
    async fn put(&self, id: &DocumentId, content: &str) -> Result<CacheEntry> {
        let updated_at = UtcDateTime::now();
        sqlx::query(include_str!("../queries/upsert_document.sql"))
            .bind(id.as_str())
            .bind(content)
            .bind(updated_at.unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(CacheEntry {
            document_id: id.clone(),
            content: content.to_string(),
            updated_at,
        })
    }

    #[instrument(level = "trace", skip(self))]
    async fn delete(&self, id: &DocumentId) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_document.sql"))
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    #[rstest]
    #[tokio::test]
    async fn test_get_missing(#[future] repo: Repository) {
        let repo = repo.await;
        assert_eq!(repo.get(&DocumentId::from("missing")).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_put_then_get(#[future] repo: Repository) {
        let repo = repo.await;
        let id = DocumentId::from("note-1");
        let written = repo.put(&id, r#"{"type":"doc","content":[]}"#).await.unwrap();
        let read = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(read.content, written.content);
        assert_eq!(read.document_id, id);
    }

    #[rstest]
    #[tokio::test]
    async fn test_put_overwrites_in_place(#[future] repo: Repository) {
        let repo = repo.await;
        let id = DocumentId::from("note-1");
        repo.put(&id, "first").await.unwrap();
        repo.put(&id, "second").await.unwrap();
        assert_eq!(repo.get(&id).await.unwrap().unwrap().content, "second");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_content_is_stored_verbatim(#[future] repo: Repository) {
        let repo = repo.await;
        let id = DocumentId::from("note-1");
        // Not normalized, not even valid JSON: the cache never interprets content.
        let raw = "{ \"b\": 1,  \"a\": [ ] ";
        repo.put(&id, raw).await.unwrap();
        assert_eq!(repo.get(&id).await.unwrap().unwrap().content, raw);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete(#[future] repo: Repository) {
        let repo = repo.await;
        let id = DocumentId::from("note-1");
        repo.put(&id, "data").await.unwrap();
        assert!(repo.delete(&id).await.unwrap());
        assert!(!repo.delete(&id).await.unwrap());
        assert_eq!(repo.get(&id).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_entries_are_per_document(#[future] repo: Repository) {
        let repo = repo.await;
        repo.put(&DocumentId::from("a"), "alpha").await.unwrap();
        repo.put(&DocumentId::from("b"), "beta").await.unwrap();
        assert_eq!(repo.get(&DocumentId::from("a")).await.unwrap().unwrap().content, "alpha");
        assert_eq!(repo.get(&DocumentId::from("b")).await.unwrap().unwrap().content, "beta");
        let mut ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|e| e.document_id).collect();
        ids.sort();
        assert_eq!(ids, vec![DocumentId::from("a"), DocumentId::from("b")]);
    }
}
