//! Submission path: fingerprint, cache check, enqueue.
//!
//! Consumed by whatever front end accepts uploads (HTTP layer, CLI). A cache
//! hit short-circuits straight to the stored report without touching the
//! queue, so byte-identical content is analyzed at most once.

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::fingerprint;
use crate::queue;
use crate::report::Report;
use crate::store;

/// Outcome of submitting a path for review.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A report for this content already exists; no job was enqueued.
    Cached(Report),
    /// The job was enqueued; query later with this fingerprint.
    Enqueued(String),
    /// The content could not be fingerprinted; the job was enqueued without
    /// a cache identity and its report will not be retrievable by digest.
    Unidentified,
}

/// Submit a file or directory for analysis.
///
/// Fingerprint failure is treated as an absent cache identity — the job
/// still runs, it just cannot be deduplicated.
pub async fn submit(pool: &SqlitePool, queue_name: &str, path: &Path) -> Result<SubmitOutcome> {
    let path_str = path.to_string_lossy().to_string();

    let Some(fp) = fingerprint::fingerprint_path(path) else {
        queue::enqueue(pool, queue_name, &path_str).await?;
        info!(path = %path.display(), "job enqueued without cache identity");
        return Ok(SubmitOutcome::Unidentified);
    };

    if let Some(report) = store::get_report(pool, &fp).await? {
        info!(path = %path.display(), fingerprint = %fp, "report already cached");
        return Ok(SubmitOutcome::Cached(report));
    }

    queue::enqueue(pool, queue_name, &path_str).await?;
    info!(path = %path.display(), fingerprint = %fp, "job enqueued");
    Ok(SubmitOutcome::Enqueued(fp))
}

/// Answer "finished or not yet" for a fingerprint.
pub async fn check_report(pool: &SqlitePool, fingerprint: &str) -> Result<Option<Report>> {
    store::get_report(pool, fingerprint).await
}
