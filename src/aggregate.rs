//! Per-job result aggregation.
//!
//! [`AnalysisState`] accumulates findings from possibly-concurrent chunk
//! analyses for the lifetime of one job. The consumer creates a fresh state
//! per job and discards it afterwards, so results can never leak across
//! jobs. A single coarse lock guards the whole map — chunk analysis, not
//! this lock, is the pipeline's bottleneck.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::report::Finding;

/// Mapping from file identity to the ordered findings accumulated for it.
///
/// The map is ordered by file path, which fixes the file-iteration order
/// seen by report synthesis. Within a file, findings keep append order.
#[derive(Debug, Default)]
pub struct AnalysisState {
    results: Mutex<BTreeMap<String, Vec<Finding>>>,
}

impl AnalysisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append findings for a file under exclusive access.
    ///
    /// An empty batch still records the file identity, so files analyzed
    /// without findings are counted in the report's file total.
    pub fn merge(&self, file: &str, findings: Vec<Finding>) {
        self.lock()
            .entry(file.to_string())
            .or_default()
            .extend(findings);
    }

    /// Clone the entire mapping for report synthesis.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Finding>> {
        self.lock().clone()
    }

    /// Reset all accumulated state.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// The pipeline has no panic path while the lock is held, but if a
    /// holder ever does panic the map itself is still consistent (every
    /// mutation is a single append or clear), so recover the guard instead
    /// of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Finding>>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn finding(file: &str, line: usize) -> Finding {
        Finding {
            file: file.to_string(),
            line,
            rule: "规则1".to_string(),
            original: "o".to_string(),
            suggested: "s".to_string(),
        }
    }

    #[test]
    fn test_merge_appends_in_call_order() {
        let state = AnalysisState::new();
        state.merge("a.cpp", vec![finding("a.cpp", 10)]);
        state.merge("a.cpp", vec![finding("a.cpp", 3)]);

        let snapshot = state.snapshot();
        let lines: Vec<usize> = snapshot["a.cpp"].iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![10, 3]);
    }

    #[test]
    fn test_empty_merge_records_file_identity() {
        let state = AnalysisState::new();
        state.merge("clean.cpp", Vec::new());
        assert_eq!(state.snapshot().len(), 1);
        assert!(state.snapshot()["clean.cpp"].is_empty());
    }

    #[test]
    fn test_clear_resets_everything() {
        let state = AnalysisState::new();
        state.merge("a.cpp", vec![finding("a.cpp", 1)]);
        state.clear();
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let state = AnalysisState::new();
        state.merge("a.cpp", vec![finding("a.cpp", 1)]);
        let snapshot = state.snapshot();
        state.merge("a.cpp", vec![finding("a.cpp", 2)]);
        assert_eq!(snapshot["a.cpp"].len(), 1);
    }

    #[test]
    fn test_state_survives_poisoned_lock() {
        let state = Arc::new(AnalysisState::new());

        // Panic while holding the lock to poison it.
        let poisoner = Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.results.lock().unwrap();
            panic!("poison the analysis state lock");
        })
        .join();

        state.merge("a.cpp", vec![finding("a.cpp", 1)]);
        assert_eq!(state.snapshot()["a.cpp"].len(), 1);
        state.clear();
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_merges_lose_no_updates() {
        let state = Arc::new(AnalysisState::new());

        let handles: Vec<_> = ["a.cpp", "b.cpp"]
            .into_iter()
            .map(|file| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        state.merge(file, vec![finding(file, i)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot["a.cpp"].len(), 1000);
        assert_eq!(snapshot["b.cpp"].len(), 1000);
        assert_eq!(snapshot.values().map(Vec::len).sum::<usize>(), 2000);
    }
}
