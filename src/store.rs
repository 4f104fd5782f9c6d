//! Content-addressed report cache.
//!
//! Finished reports are persisted keyed by the job's content fingerprint.
//! Identical bytes fingerprint identically, so the cache holds at most one
//! report per distinct content no matter how often it is submitted. Writes
//! are single upsert statements — a concurrent `get` sees either the old
//! row or the new one, never a partial write.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::report::Report;

/// Look up the finished report for a fingerprint.
pub async fn get_report(pool: &SqlitePool, fingerprint: &str) -> Result<Option<Report>> {
    let content: Option<String> =
        sqlx::query_scalar("SELECT content FROM reports WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(pool)
            .await?;

    match content {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Persist a finished report under its fingerprint.
///
/// Re-running the same content re-derives the same report, so an existing
/// row is simply overwritten.
pub async fn put_report(pool: &SqlitePool, fingerprint: &str, report: &Report) -> Result<()> {
    let content = serde_json::to_string(report)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO reports (fingerprint, content, created_at) VALUES (?, ?, ?)
        ON CONFLICT(fingerprint) DO UPDATE SET
            content = excluded.content,
            created_at = excluded.created_at
        "#,
    )
    .bind(fingerprint)
    .bind(&content)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
