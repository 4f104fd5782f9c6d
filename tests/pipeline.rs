//! End-to-end pipeline tests: submit → queue → worker → report cache.
//!
//! The analysis backend is an in-process scripted double so runs are
//! deterministic and need no model server.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use stdcheck::analyzer::AnalysisBackend;
use stdcheck::config::{load_config, Config};
use stdcheck::consumer::{self, WorkerStatus};
use stdcheck::submit::{check_report, submit, SubmitOutcome};
use stdcheck::{db, export, migrate, queue};

/// Backend double that replays canned responses in call order, then answers
/// "OK" for any further chunk.
struct ScriptedBackend {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, _prompt: &str) -> Result<String> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "OK".to_string()))
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

fn setup_config(root: &Path) -> Config {
    let content = format!(
        r#"[db]
path = "{root}/data/stdcheck.sqlite"

[queue]
poll_interval_ms = 25
backoff_secs = 1

[chunking]
max_lines = 500

[review]
results_dir = "{root}/results"
"#,
        root = root.display()
    );
    let config_path = root.join("stdcheck.toml");
    fs::write(&config_path, content).unwrap();
    load_config(&config_path).unwrap()
}

fn write_numbered_cpp(path: &PathBuf, lines: usize) {
    let body = (0..lines)
        .map(|i| format!("int value_{} = 0;", i))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(path, body).unwrap();
}

async fn await_report(
    pool: &sqlx::SqlitePool,
    fingerprint: &str,
) -> stdcheck::report::Report {
    for _ in 0..200 {
        if let Some(report) = check_report(pool, fingerprint).await.unwrap() {
            return report;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("report for {} never appeared", fingerprint);
}

#[tokio::test]
async fn end_to_end_single_file_with_offset_translation() {
    let tmp = TempDir::new().unwrap();
    let config = setup_config(tmp.path());

    // 1,200 lines at 500/chunk => 3 chunks; the middle chunk (file offset
    // 500) reports local line 150, which must surface as file line 650.
    let file = tmp.path().join("widget.cpp");
    write_numbered_cpp(&file, 1200);

    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let backend = ScriptedBackend::new(&["OK", "150:规则1:index type:use size_t", "OK"]);
    let handle = consumer::spawn(config.clone(), backend).unwrap();

    let fingerprint = match submit(&pool, &config.queue.name, &file).await.unwrap() {
        SubmitOutcome::Enqueued(fp) => fp,
        other => panic!("expected Enqueued, got {:?}", other),
    };

    let report = await_report(&pool, &fingerprint).await;
    assert_eq!(report.file_name, "widget");
    assert_eq!(report.rule_count, 3);
    assert_eq!(report.total_files, 1);
    assert_eq!(report.total_issues, 1);
    assert_eq!(report.issues[0].line, 650);
    assert_eq!(report.issues[0].rule, "规则1");
    assert_eq!(report.issues[0].original, "index type");
    assert_eq!(report.issues[0].suggested, "use size_t");

    handle.shutdown().await;
    pool.close().await;
}

#[tokio::test]
async fn second_submission_short_circuits_without_queueing() {
    let tmp = TempDir::new().unwrap();
    let config = setup_config(tmp.path());

    let file = tmp.path().join("widget.cpp");
    write_numbered_cpp(&file, 10);

    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let backend = ScriptedBackend::new(&["2:规则2:c cast:use static_cast"]);
    let handle = consumer::spawn(config.clone(), backend).unwrap();

    let fingerprint = match submit(&pool, &config.queue.name, &file).await.unwrap() {
        SubmitOutcome::Enqueued(fp) => fp,
        other => panic!("expected Enqueued, got {:?}", other),
    };
    let first = await_report(&pool, &fingerprint).await;
    handle.shutdown().await;

    // Byte-identical content: the cache answers directly, nothing enqueued.
    match submit(&pool, &config.queue.name, &file).await.unwrap() {
        SubmitOutcome::Cached(report) => assert_eq!(report, first),
        other => panic!("expected Cached, got {:?}", other),
    }
    assert_eq!(queue::depth(&pool, &config.queue.name).await.unwrap(), 0);
    pool.close().await;

    // Deterministically-named tabular artifact for the cached report.
    export::run_export(&config, &fingerprint, None).await.unwrap();
    let csv_path = tmp.path().join("results").join("widget_result.csv");
    let csv = fs::read_to_string(csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "文件,行号,规则,问题描述,建议修正");
    assert_eq!(lines.len(), 1 + first.total_issues);
}

#[tokio::test]
async fn directory_job_reviews_in_scope_files_only() {
    let tmp = TempDir::new().unwrap();
    let config = setup_config(tmp.path());

    let dir = tmp.path().join("project");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("alpha.cpp"), "int* p;\nchar c = (char)300;").unwrap();
    fs::write(dir.join("beta.cpp"), "size_t n = 0;").unwrap();
    // Out of review scope: must not consume a scripted response.
    fs::write(dir.join("notes.txt"), "just notes").unwrap();

    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    // Files are walked in sorted order: alpha.cpp then beta.cpp.
    let backend = ScriptedBackend::new(&["0:规则3:未初始化指针:使用nullptr初始化", "OK"]);
    let handle = consumer::spawn(config.clone(), backend).unwrap();

    let fingerprint = match submit(&pool, &config.queue.name, &dir).await.unwrap() {
        SubmitOutcome::Enqueued(fp) => fp,
        other => panic!("expected Enqueued, got {:?}", other),
    };

    let report = await_report(&pool, &fingerprint).await;
    assert_eq!(report.total_files, 2);
    assert_eq!(report.total_issues, 1);
    assert!(report.issues[0].file.ends_with("alpha.cpp"));
    assert_eq!(report.issues[0].line, 0);
    assert_eq!(report.issues[0].rule, "规则3");

    handle.shutdown().await;
    pool.close().await;
}

#[tokio::test]
async fn worker_survives_unreadable_job_and_keeps_consuming() {
    let tmp = TempDir::new().unwrap();
    let config = setup_config(tmp.path());

    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    // A job pointing nowhere is logged and dropped, not fatal.
    queue::enqueue(&pool, &config.queue.name, "/no/such/path.cpp")
        .await
        .unwrap();

    let file = tmp.path().join("widget.cpp");
    write_numbered_cpp(&file, 10);

    let backend = ScriptedBackend::new(&["OK"]);
    let handle = consumer::spawn(config.clone(), backend).unwrap();

    let fingerprint = match submit(&pool, &config.queue.name, &file).await.unwrap() {
        SubmitOutcome::Enqueued(fp) => fp,
        other => panic!("expected Enqueued, got {:?}", other),
    };

    let report = await_report(&pool, &fingerprint).await;
    assert_eq!(report.total_files, 1);
    assert_eq!(report.total_issues, 0);

    handle.shutdown().await;
    pool.close().await;
}

#[tokio::test]
async fn worker_backs_off_on_store_failure_and_recovers() {
    let tmp = TempDir::new().unwrap();
    // The db path's parent is a regular file, so the store cannot open.
    let blocked = tmp.path().join("data");
    fs::write(&blocked, "not a directory").unwrap();
    let config = setup_config(tmp.path());

    let backend = ScriptedBackend::new(&["OK"]);
    let handle = consumer::spawn(config.clone(), backend).unwrap();

    // Across more than one backoff interval (backoff_secs = 1) the worker
    // keeps cycling Disconnected -> Connecting: it never reaches Consuming,
    // never stops, never panics.
    let mut saw_connecting = false;
    for _ in 0..15 {
        let status = handle.status();
        assert!(
            matches!(
                status,
                WorkerStatus::Disconnected | WorkerStatus::Connecting
            ),
            "unexpected status during outage: {:?}",
            status
        );
        saw_connecting |= status == WorkerStatus::Connecting;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(saw_connecting, "worker never attempted to connect");

    // Repair the store: the worker reconnects on its own and drains a
    // freshly queued job.
    fs::remove_file(&blocked).unwrap();
    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let file = tmp.path().join("widget.cpp");
    write_numbered_cpp(&file, 10);
    let fingerprint = match submit(&pool, &config.queue.name, &file).await.unwrap() {
        SubmitOutcome::Enqueued(fp) => fp,
        other => panic!("expected Enqueued, got {:?}", other),
    };

    let report = await_report(&pool, &fingerprint).await;
    assert_eq!(report.total_files, 1);

    handle.shutdown().await;
    pool.close().await;
}

#[tokio::test]
async fn worker_reaches_consuming_and_stops_cleanly() {
    let tmp = TempDir::new().unwrap();
    let config = setup_config(tmp.path());

    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    pool.close().await;

    let backend = ScriptedBackend::new(&[]);
    let handle = consumer::spawn(config, backend).unwrap();

    let mut consuming = false;
    for _ in 0..200 {
        if handle.status() == WorkerStatus::Consuming {
            consuming = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(consuming, "worker never reached Consuming");

    handle.shutdown().await;
}
