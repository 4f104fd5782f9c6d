use anyhow::Result;
use sqlx::SqlitePool;

use crate::queue;

/// Create the report cache and job queue tables. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            fingerprint TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    queue::declare(pool).await?;

    Ok(())
}
