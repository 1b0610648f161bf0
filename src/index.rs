//! Full-text search index over notes.
//!
//! A derived copy of the note store kept in an SQLite FTS5 table
//! (`notes_fts(id, title, content)`) inside the store root. The file name
//! has no `.md` extension, so the store never lists it as a note.
//!
//! Every write goes through its own transaction. An upsert deletes and
//! re-inserts the row for an id inside one transaction, so a concurrent
//! search sees either the old row or the new one, never both or neither.

use sqlx::{Row, SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

use crate::db;
use crate::error::{NoteError, Result};
use crate::migrate;
use crate::models::{Note, SearchHit};

/// Index database file name inside the store root.
pub const INDEX_FILE: &str = "index.db";

/// Maximum number of hits returned by [`SearchIndex::search`].
pub const MAX_RESULTS: i64 = 20;

#[derive(Clone)]
pub struct SearchIndex {
    pool: SqlitePool,
}

impl SearchIndex {
    /// Open (or create) the index file under `root`.
    ///
    /// Fails with [`NoteError::IndexUnavailable`] when the database cannot
    /// be opened or the engine lacks FTS5.
    pub async fn open(root: &Path) -> Result<Self> {
        let path = root.join(INDEX_FILE);
        let pool = db::connect(&path)
            .await
            .map_err(|e| NoteError::IndexUnavailable(format!("{}: {:#}", path.display(), e)))?;
        migrate::run_migrations(&pool)
            .await
            .map_err(|e| NoteError::IndexUnavailable(e.to_string()))?;

        info!(path = %path.display(), "search index opened");
        Ok(Self { pool })
    }

    /// Insert or replace the entry for `note.id`.
    pub async fn index(&self, note: &Note) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notes_fts WHERE id = ?")
            .bind(&note.id)
            .execute(&mut *tx)
            .await?;
        insert(&mut tx, note).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove the entry for `id`. Removing an absent id is not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM notes_fts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Run an FTS5 `MATCH` query and return up to [`MAX_RESULTS`] hits,
    /// most relevant first.
    ///
    /// The query uses the engine's own syntax (`AND`, `OR`, `"phrases"`,
    /// `prefix*`, `title:word`). Queries the engine rejects fail with
    /// [`NoteError::QuerySyntax`] carrying the engine's message.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(NoteError::invalid_argument("query must not be empty"));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, title, rank,
                   snippet(notes_fts, 2, '<b>', '</b>', '...', 64) AS excerpt
            FROM notes_fts
            WHERE notes_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(query)
        .bind(MAX_RESULTS)
        .fetch_all(&self.pool)
        .await
        .map_err(classify_query_error)?;

        let hits = rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                SearchHit {
                    id: row.get("id"),
                    title: row.get("title"),
                    excerpt: row.get("excerpt"),
                    score: -rank, // negate so higher = better
                }
            })
            .collect();

        Ok(hits)
    }

    /// Replace the whole index with `notes` in one transaction.
    ///
    /// A note that fails to insert is logged and skipped; only failing to
    /// begin or commit the transaction aborts the rebuild. Returns the
    /// number of notes inserted.
    pub async fn reindex_all(&self, notes: &[Note]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notes_fts").execute(&mut *tx).await?;

        let mut inserted = 0;
        for note in notes {
            match insert(&mut tx, note).await {
                Ok(()) => inserted += 1,
                Err(e) => warn!(id = %note.id, error = %e, "failed to index note"),
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Number of entries currently in the index.
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes_fts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn insert(conn: &mut SqliteConnection, note: &Note) -> Result<()> {
    sqlx::query("INSERT INTO notes_fts (id, title, content) VALUES (?, ?, ?)")
        .bind(&note.id)
        .bind(&note.title)
        .bind(&note.content)
        .execute(conn)
        .await?;
    Ok(())
}

/// FTS5 reports malformed `MATCH` expressions as plain SQLite errors;
/// recognize them by message so callers can answer 400 instead of 500.
fn classify_query_error(err: sqlx::Error) -> NoteError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message();
        if is_query_syntax_message(msg) {
            return NoteError::QuerySyntax(msg.to_string());
        }
    }
    NoteError::Index(err)
}

fn is_query_syntax_message(msg: &str) -> bool {
    ["fts5", "syntax error", "no such column", "unterminated", "unknown special query"]
        .iter()
        .any(|pattern| msg.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn note(id: &str, title: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    async fn open(tmp: &TempDir) -> SearchIndex {
        SearchIndex::open(tmp.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_file_and_is_reopenable() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index.index(&note("a", "A", "alpha")).await.unwrap();
        index.close().await;

        assert!(tmp.path().join(INDEX_FILE).is_file());
        let index = open(&tmp).await;
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_is_idempotent_upsert() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        let n = note("deploy", "Deploy", "rollout checklist");
        index.index(&n).await.unwrap();
        index.index(&n).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let hits = index.search("rollout").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "deploy");
    }

    #[tokio::test]
    async fn test_index_replaces_old_content() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        index.index(&note("n", "N", "old words")).await.unwrap();
        index.index(&note("n", "N", "fresh words")).await.unwrap();

        assert!(index.search("old").await.unwrap().is_empty());
        assert_eq!(index.search("fresh").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        index.delete("never-there").await.unwrap();
        index.index(&note("x", "X", "content")).await.unwrap();
        index.delete("x").await.unwrap();
        index.delete("x").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_ranks_and_highlights() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        index
            .index(&note("weak", "Misc", &format!("{} kubernetes", "filler ".repeat(200))))
            .await
            .unwrap();
        index
            .index(&note("strong", "Kubernetes", "kubernetes kubernetes kubernetes"))
            .await
            .unwrap();

        let hits = index.search("kubernetes").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "strong");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].excerpt.contains("<b>kubernetes</b>"));
        // Long bodies are cut down to an excerpt.
        assert!(hits[1].excerpt.len() < 1400);
        assert!(hits[1].excerpt.starts_with("..."));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replace_is_atomic_to_concurrent_search() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index
            .index(&note("live", "Live", "steady version0"))
            .await
            .unwrap();

        let writer = {
            let index = index.clone();
            tokio::spawn(async move {
                for v in 1..=200 {
                    let body = format!("steady version{v}");
                    index.index(&note("live", "Live", &body)).await.unwrap();
                }
            })
        };
        let reader = {
            let index = index.clone();
            tokio::spawn(async move {
                for _ in 0..400 {
                    let hits = index.search("steady").await.unwrap();
                    assert_eq!(hits.len(), 1, "search saw a half-applied replace");
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(index.search("version200").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_limit() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        let notes: Vec<Note> = (0..30)
            .map(|i| note(&format!("n{i}"), "Common", "shared term"))
            .collect();
        index.reindex_all(&notes).await.unwrap();

        let hits = index.search("shared").await.unwrap();
        assert_eq!(hits.len(), MAX_RESULTS as usize);
    }

    #[tokio::test]
    async fn test_search_matches_id_and_title() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        index
            .index(&note("zebra-notes", "Savanna Trip", "nothing relevant"))
            .await
            .unwrap();
        assert_eq!(index.search("zebra").await.unwrap().len(), 1);
        assert_eq!(index.search("savanna").await.unwrap().len(), 1);
        assert_eq!(index.search("title:savanna").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_syntax_error() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index.index(&note("a", "A", "alpha")).await.unwrap();

        let err = index.search("(alpha").await.unwrap_err();
        assert!(matches!(err, NoteError::QuerySyntax(_)), "got {err:?}");

        let err = index.search("nosuchcolumn:alpha").await.unwrap_err();
        assert!(matches!(err, NoteError::QuerySyntax(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        assert!(matches!(
            index.search("  ").await,
            Err(NoteError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_reindex_all_replaces_everything() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;

        index.index(&note("stale", "Stale", "obsolete")).await.unwrap();

        let notes = vec![
            note("one", "One", "apple"),
            note("two", "Two", "banana"),
            note("three", "Three", "cherry"),
        ];
        assert_eq!(index.reindex_all(&notes).await.unwrap(), 3);
        assert_eq!(index.count().await.unwrap(), 3);

        assert!(index.search("obsolete").await.unwrap().is_empty());
        for (query, id) in [("apple", "one"), ("banana", "two"), ("cherry", "three")] {
            let hits = index.search(query).await.unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id, id);
        }
    }

    #[test]
    fn test_query_syntax_messages() {
        assert!(is_query_syntax_message("fts5: syntax error near \"\""));
        assert!(is_query_syntax_message("no such column: nosuch"));
        assert!(!is_query_syntax_message("database is locked"));
    }
}
