use std::path::{Path, PathBuf};

use crate::descriptor::SourceKind;
use crate::error::StorageError;

pub const PROCESSING_DIR: &str = "processing";
pub const COMPLETED_DIR: &str = "completed";

/// Directory layout of one upstream source:
///
/// ```text
/// <base>/<source>/              intake
/// <base>/<source>/processing/   in-flight descriptors
/// <base>/<source>/completed/    published references
/// ```
#[derive(Debug, Clone)]
pub struct SourceLayout {
    kind: SourceKind,
    intake: PathBuf,
}

impl SourceLayout {
    pub fn new<P: AsRef<Path>>(kind: SourceKind, intake: P) -> Self {
        Self {
            kind,
            intake: intake.as_ref().to_path_buf(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn intake(&self) -> &Path {
        &self.intake
    }

    pub fn processing(&self) -> PathBuf {
        self.intake.join(PROCESSING_DIR)
    }

    pub fn completed(&self) -> PathBuf {
        self.intake.join(COMPLETED_DIR)
    }

    /// Creates the intake, processing and completed directories. Idempotent.
    pub fn bootstrap(&self) -> Result<(), StorageError> {
        for dir in [self.intake.clone(), self.processing(), self.completed()] {
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// True for the processing and completed areas themselves.
    pub fn is_reserved(&self, path: &Path) -> bool {
        path == self.processing() || path == self.completed()
    }

    /// True if `path` sits directly inside the processing area.
    pub fn is_in_processing(&self, path: &Path) -> bool {
        path.parent().map(|p| p == self.processing()).unwrap_or(false)
    }
}
