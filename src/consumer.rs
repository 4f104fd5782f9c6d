//! Job queue consumer.
//!
//! A supervised background worker drives the queue state machine:
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Declaring ──▶ Consuming
//!       ▲                                           │
//!       └────────── fixed backoff ◀──────── any failure
//! ```
//!
//! Every infrastructure failure (store unreachable, declare failed, receive
//! failed) logs, sleeps the fixed backoff, and reconnects — indefinitely,
//! with no retry cap and no fatal path. Per-file errors are logged and
//! skipped; a single bad job can never take the worker down.
//!
//! For each job the worker resolves the path (recursing into directories),
//! chunks each in-scope file, dispatches chunk analyses sequentially in
//! increasing offset order, accumulates parsed findings in a per-job
//! [`AnalysisState`], and finally synthesizes and stores the report keyed by
//! the job's content fingerprint.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::aggregate::AnalysisState;
use crate::analyzer::{build_prompt, AnalysisBackend};
use crate::chunk::split_lines;
use crate::config::Config;
use crate::db;
use crate::fingerprint;
use crate::parse::parse_response;
use crate::queue;
use crate::report::{display_name, synthesize};
use crate::rules;
use crate::store;

/// Observable state of the consumer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Disconnected,
    Connecting,
    Declaring,
    Consuming,
    Stopped,
}

/// Handle to a running worker: observe its state, stop it cleanly.
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<WorkerStatus>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn status(&self) -> WorkerStatus {
        *self.status_rx.borrow()
    }

    /// Signal shutdown and wait for the worker to finish its current step.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Start the background worker.
pub fn spawn(config: Config, backend: Arc<dyn AnalysisBackend>) -> Result<WorkerHandle> {
    let scope = build_globset(&config.review.include_globs)?;
    let rules = rules::active_rules(&config.rules);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(WorkerStatus::Disconnected);

    let worker = Worker {
        config,
        backend,
        rules,
        scope,
    };
    let task = tokio::spawn(worker.run(shutdown_rx, status_tx));

    Ok(WorkerHandle {
        shutdown_tx,
        status_rx,
        task,
    })
}

enum ConsumeExit {
    Shutdown,
    Infrastructure,
}

struct Worker {
    config: Config,
    backend: Arc<dyn AnalysisBackend>,
    rules: Vec<String>,
    scope: GlobSet,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>, status: watch::Sender<WorkerStatus>) {
        let backoff = Duration::from_secs(self.config.queue.backoff_secs);

        loop {
            if *shutdown.borrow() {
                break;
            }
            let _ = status.send(WorkerStatus::Disconnected);

            // Open the durable store
            let _ = status.send(WorkerStatus::Connecting);
            let pool = match db::connect(&self.config.db.path).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "failed to open queue store");
                    if sleep_or_shutdown(backoff, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            // Declare the queue
            let _ = status.send(WorkerStatus::Declaring);
            if let Err(e) = queue::declare(&pool).await {
                error!(error = %e, "failed to declare queue");
                pool.close().await;
                if sleep_or_shutdown(backoff, &mut shutdown).await {
                    break;
                }
                continue;
            }

            let _ = status.send(WorkerStatus::Consuming);
            info!(
                queue = %self.config.queue.name,
                model = %self.backend.model_name(),
                "waiting for file scan jobs"
            );

            let exit = self.consume(&pool, &mut shutdown).await;
            pool.close().await;

            match exit {
                ConsumeExit::Shutdown => break,
                ConsumeExit::Infrastructure => {
                    if sleep_or_shutdown(backoff, &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        let _ = status.send(WorkerStatus::Stopped);
        info!("worker stopped");
    }

    async fn consume(&self, pool: &SqlitePool, shutdown: &mut watch::Receiver<bool>) -> ConsumeExit {
        let poll = Duration::from_millis(self.config.queue.poll_interval_ms);

        loop {
            if *shutdown.borrow() {
                return ConsumeExit::Shutdown;
            }

            match queue::take_next(pool, &self.config.queue.name).await {
                Err(e) => {
                    error!(error = %e, "queue receive failed");
                    return ConsumeExit::Infrastructure;
                }
                Ok(Some(path)) => self.process_job(pool, &path).await,
                Ok(None) => {
                    if sleep_or_shutdown(poll, shutdown).await {
                        return ConsumeExit::Shutdown;
                    }
                }
            }
        }
    }

    /// Run the full pipeline for one dequeued job. Never fails the consumer:
    /// all errors end at a log line.
    async fn process_job(&self, pool: &SqlitePool, job_path: &str) {
        info!(path = %job_path, "processing file scan job");
        let path = Path::new(job_path);

        // Aggregation context owned by this job alone
        let state = AnalysisState::new();

        if let Err(e) = self.process_path(path, &state).await {
            error!(path = %job_path, error = %e, "failed to process file or directory");
            return;
        }

        // The job only counts as processed while the backend is live
        if let Err(e) = self.backend.health().await {
            error!(error = %e, "analysis backend failed liveness probe");
            return;
        }

        let snapshot = state.snapshot();
        let report = synthesize(
            &display_name(path),
            &self.config.review.title,
            self.rules.len(),
            &snapshot,
        );
        state.clear();

        match fingerprint::fingerprint_path(path) {
            Some(fp) => match store::put_report(pool, &fp, &report).await {
                Ok(()) => info!(
                    fingerprint = %fp,
                    total_files = report.total_files,
                    total_issues = report.total_issues,
                    "report stored"
                ),
                Err(e) => error!(fingerprint = %fp, error = %e, "failed to store report"),
            },
            None => {
                warn!(path = %job_path, "no cache identity for job; report not persisted")
            }
        }
    }

    async fn process_path(&self, path: &Path, state: &AnalysisState) -> Result<()> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?;

        if !meta.is_dir() {
            return self.process_file(path, state).await;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "directory walk error; skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Err(e) = self.process_file(entry.path(), state).await {
                error!(file = %entry.path().display(), error = %e, "failed to process file; continuing");
            }
        }

        Ok(())
    }

    async fn process_file(&self, path: &Path, state: &AnalysisState) -> Result<()> {
        if !self.scope.is_match(path) {
            debug!(file = %path.display(), "skipping file outside review scope");
            return Ok(());
        }

        info!(file = %path.display(), "reviewing file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let file_id = path.to_string_lossy().to_string();

        let chunks = split_lines(&content, self.config.chunking.max_lines);
        debug!(file = %file_id, chunk_count = chunks.len(), "file chunked");

        // Sequential dispatch in increasing offset order keeps findings in
        // file order; a failed chunk is dropped, not retried.
        for chunk in &chunks {
            let prompt = build_prompt(&self.rules, &chunk.text);
            match self.backend.analyze(&prompt).await {
                Ok(response) => {
                    let findings = parse_response(&response, &file_id, chunk.start_line);
                    debug!(
                        file = %file_id,
                        start_line = chunk.start_line,
                        findings = findings.len(),
                        "chunk analyzed"
                    );
                    state.merge(&file_id, findings);
                }
                Err(e) => error!(
                    file = %file_id,
                    start_line = chunk.start_line,
                    error = %e,
                    "chunk analysis failed; dropping chunk"
                ),
            }
        }

        Ok(())
    }
}

async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => *shutdown.borrow(),
        _ = shutdown.changed() => true,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
