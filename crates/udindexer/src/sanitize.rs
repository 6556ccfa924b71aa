//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Span fields carry descriptor and link names only, never the watch or
//! mount layout around them.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
