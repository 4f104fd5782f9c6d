//! Content fingerprinting for cache identity.
//!
//! Identical bytes produce identical fingerprints, so the report cache holds
//! at most one report per distinct content. The digest algorithm only needs
//! to be stable across runs; SHA-256 hex is used throughout.

use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// SHA-256 hex digest of a byte slice.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint a job path: a file's bytes, or for a directory a digest over
/// every contained regular file (relative path plus content, in sorted walk
/// order).
///
/// Returns `None` when the content cannot be read — callers treat that as
/// "no cache identity available" and proceed without dedup rather than
/// failing the pipeline.
pub fn fingerprint_path(path: &Path) -> Option<String> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat path for fingerprinting");
            return None;
        }
    };

    if !meta.is_dir() {
        return match std::fs::read(path) {
            Ok(bytes) => Some(fingerprint_bytes(&bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file for fingerprinting");
                None
            }
        };
    }

    let mut hasher = Sha256::new();
    let mut hashed_any = false;
    let walker = WalkDir::new(path).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "directory walk failed during fingerprinting");
                return None;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                hasher.update(relative.to_string_lossy().as_bytes());
                hasher.update(&bytes);
                hashed_any = true;
            }
            Err(e) => {
                warn!(file = %entry.path().display(), error = %e, "cannot read file for fingerprinting");
                return None;
            }
        }
    }

    if !hashed_any {
        return None;
    }
    Some(format!("{:x}", hasher.finalize()))
}
