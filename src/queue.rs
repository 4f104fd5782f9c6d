//! Durable job queue.
//!
//! Jobs are file-system paths persisted in the `jobs` table until a consumer
//! takes them. [`take_next`] removes the row it returns inside a single
//! transaction, which gives the same at-most-once delivery the pipeline has
//! always had: a crash after take but before the report is written loses
//! that job instead of redelivering it.
//!
//! SQLite has no push delivery, so "blocking receive" is a poll at a
//! configurable interval (see the consumer loop).

use anyhow::Result;
use sqlx::SqlitePool;

/// Declare the durable queue: create the `jobs` table if needed. Idempotent.
pub async fn declare(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            queue TEXT NOT NULL,
            path TEXT NOT NULL,
            enqueued_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_queue ON jobs(queue, id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Publish a path onto the named queue. The body is the bare UTF-8 path —
/// no structured envelope.
pub async fn enqueue(pool: &SqlitePool, queue: &str, path: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("INSERT INTO jobs (queue, path, enqueued_at) VALUES (?, ?, ?)")
        .bind(queue)
        .bind(path)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

/// Take the oldest job off the named queue, or `None` when it is empty.
///
/// The returned job is deleted before this function returns (auto-ack).
pub async fn take_next(pool: &SqlitePool, queue: &str) -> Result<Option<String>> {
    let mut tx = pool.begin().await?;

    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, path FROM jobs WHERE queue = ? ORDER BY id LIMIT 1")
            .bind(queue)
            .fetch_optional(&mut *tx)
            .await?;

    let Some((id, path)) = row else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(path))
}

/// Number of jobs waiting on the named queue.
pub async fn depth(pool: &SqlitePool, queue: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ?")
        .bind(queue)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
