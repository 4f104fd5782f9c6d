//! Export a cached report as a tabular CSV artifact.
//!
//! One row per finding, columns 文件/行号/规则/问题描述/建议修正, named
//! deterministically from the source file's base name
//! (`<base>_result.csv`) under the configured results directory.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::report::Report;
use crate::store;

/// Fetch the report stored for `fingerprint` and write it as CSV.
///
/// `output` overrides the default deterministic path.
pub async fn run_export(config: &Config, fingerprint: &str, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let report = store::get_report(&pool, fingerprint)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No report stored for fingerprint {}", fingerprint))?;
    pool.close().await;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => default_export_path(config, &report),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&path, render_csv(&report))?;

    println!("export {}", fingerprint);
    println!("  findings: {}", report.total_issues);
    println!("  wrote: {}", path.display());
    println!("ok");

    Ok(())
}

fn default_export_path(config: &Config, report: &Report) -> PathBuf {
    config
        .review
        .results_dir
        .join(format!("{}_result.csv", report.file_name))
}

fn render_csv(report: &Report) -> String {
    let mut out = String::from("文件,行号,规则,问题描述,建议修正\n");
    for issue in &report.issues {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&issue.file),
            issue.line,
            csv_field(&issue.rule),
            csv_field(&issue.original),
            csv_field(&issue.suggested),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
