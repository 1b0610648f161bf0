use sqlx::SqlitePool;

/// Create the FTS5 table backing the search index.
///
/// Every column is searchable, `id` included, so a query for a note's
/// slug finds it even when the slug appears nowhere in its text.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='notes_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query("CREATE VIRTUAL TABLE notes_fts USING fts5(id, title, content)")
            .execute(pool)
            .await?;
    }

    Ok(())
}
