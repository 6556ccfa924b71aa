//! Job descriptors: the NZB announcements dropped into the intake roots.

pub mod nzb;

use std::fmt;
use std::path::Path;

pub use nzb::{parse_descriptor, parse_descriptor_bytes};

/// File suffix of descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "nzb";

/// Which upstream download manager announced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Movie,
    Series,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Movie, SourceKind::Series];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Movie => "movie",
            SourceKind::Series => "series",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed announcement. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Subject of the first declared file; the name searched for on the mount.
    pub declared_name: String,
    /// Sum of all segment byte counts.
    pub declared_size_bytes: u64,
    pub source_kind: SourceKind,
    /// File name of the descriptor itself (e.g. `Show.S01E02.nzb`).
    pub descriptor_file: String,
}

/// Returns true if `path` carries the descriptor suffix.
pub fn is_descriptor_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
        .unwrap_or(false)
}
