//! Exact-name, size-tolerant search of the content mount.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::WorkerError;

/// Allowed relative size difference, in percent of the declared size.
pub const SIZE_TOLERANCE_PERCENT: u64 = 3;

/// `|actual - declared| <= 3% of declared`, in exact integer arithmetic.
pub fn within_tolerance(actual: u64, declared: u64) -> bool {
    let diff = actual.abs_diff(declared) as u128;
    diff * 100 <= declared as u128 * SIZE_TOLERANCE_PERCENT as u128
}

/// Walks the content mount looking for a file by exact name.
#[derive(Debug, Clone)]
pub struct ContentSearch {
    root: PathBuf,
}

impl ContentSearch {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the absolute path of the first file named `name` whose size is
    /// within tolerance of `declared_size`.
    ///
    /// The walk is depth-first in file-name order and stops at the first hit.
    /// Unreadable subtrees are skipped.
    pub fn find(&self, name: &str, declared_size: u64) -> Option<PathBuf> {
        let mut visited = 0usize;

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    let err = WorkerError::ScanFailed { path, source: e };
                    warn!("Skipping unreadable subtree: {}", err);
                    continue;
                }
            };

            visited += 1;
            if entry.file_type().is_dir() || entry.file_name().to_str() != Some(name) {
                continue;
            }

            // Follows symlinks so linked content reports the real size.
            let actual = match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => continue,
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if within_tolerance(actual, declared_size) {
                debug!("Matched after visiting {} entries", visited);
                let path = entry.into_path();
                return Some(std::path::absolute(&path).unwrap_or(path));
            }

            info!(
                path = %entry.path().display(),
                actual,
                declared = declared_size,
                "Name match outside size tolerance"
            );
        }

        debug!("No match after visiting {} entries", visited);
        None
    }
}
