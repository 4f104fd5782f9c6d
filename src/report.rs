//! Report data model and synthesis.
//!
//! A [`Finding`] is a single rule violation located in one file. A [`Report`]
//! collates every finding accumulated for one job into an immutable record
//! that is persisted to the report cache keyed by content fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A single reported rule violation with location and suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    /// File-global line number (chunk offset already applied).
    pub line: usize,
    /// Rule identifier, e.g. `规则2`.
    pub rule: String,
    /// Excerpt or description of the offending construct.
    pub original: String,
    pub suggested: String,
}

/// The finished analysis result for one job. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub file_name: String,
    pub title: String,
    pub rule_count: usize,
    pub total_files: usize,
    pub total_issues: usize,
    pub issues: Vec<Finding>,
}

/// Collate an aggregator snapshot into a [`Report`].
///
/// Pure function of its inputs: findings are flattened in file-iteration
/// order (the snapshot map is ordered by file path), preserving within-file
/// append order. `total_files` counts every file identity present in the
/// snapshot, including files analyzed without findings.
pub fn synthesize(
    file_name: &str,
    title: &str,
    rule_count: usize,
    snapshot: &BTreeMap<String, Vec<Finding>>,
) -> Report {
    let mut issues = Vec::new();
    for findings in snapshot.values() {
        issues.extend(findings.iter().cloned());
    }

    Report {
        file_name: file_name.to_string(),
        title: title.to_string(),
        rule_count,
        total_files: snapshot.len(),
        total_issues: issues.len(),
        issues,
    }
}

/// Base name of a path with its extension stripped, used to name reports
/// and export artifacts.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
