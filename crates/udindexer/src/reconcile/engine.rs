//! Per-descriptor state machine: parse, move to processing, search, publish,
//! clean up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use super::layout::SourceLayout;
use super::publish::Publisher;
use super::search::ContentSearch;
use crate::descriptor::{parse_descriptor, JobDescriptor};
use crate::error::{ReconcileError, StorageError};
use crate::sanitize::redact_path;
use crate::worker::job::{Job, JobResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Discovered,
    Moved,
    Searching,
    Matched,
    Unmatched,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Matched | JobState::Unmatched | JobState::Failed)
    }
}

/// One descriptor's trip through the engine.
#[derive(Debug)]
pub struct ReconciliationJob {
    pub id: String,
    pub source_path: PathBuf,
    pub descriptor: Option<JobDescriptor>,
    pub state: JobState,
    pub processing_path: Option<PathBuf>,
    pub matched_path: Option<PathBuf>,
}

impl ReconciliationJob {
    pub fn discovered(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            source_path: job.source_path.clone(),
            descriptor: None,
            state: JobState::Discovered,
            processing_path: None,
            matched_path: None,
        }
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(!self.state.is_terminal(), "job already terminal");
        debug_assert!(
            !(next == JobState::Discovered && self.state != JobState::Discovered),
            "job cannot re-enter Discovered"
        );
        debug!(from = ?self.state, to = ?next, "State change");
        self.state = next;
    }
}

/// Receives every successfully parsed descriptor. Must not block.
pub trait DescriptorObserver: Send + Sync {
    fn descriptor_parsed(&self, descriptor: &JobDescriptor);
}

pub struct ReconcileEngine {
    layout: SourceLayout,
    search: ContentSearch,
    publisher: Publisher,
    observer: Option<Arc<dyn DescriptorObserver>>,
}

impl ReconcileEngine {
    pub fn new<P: AsRef<Path>>(layout: SourceLayout, content_mount: P) -> Self {
        let publisher = Publisher::new(layout.completed());
        Self {
            layout,
            search: ContentSearch::new(content_mount),
            publisher,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DescriptorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Drives one job to a terminal state.
    pub fn run(&self, job: &Job) -> JobResult {
        let _span = info_span!(
            "reconcile",
            job_id = %job.id,
            source = %self.layout.kind(),
            file = %redact_path(&job.source_path),
        )
        .entered();

        let mut rjob = ReconciliationJob::discovered(job);
        match self.drive(&mut rjob) {
            Ok(published) => JobResult::finished(rjob, published),
            Err(e) => {
                error!(error = %e, "Reconciliation failed");
                rjob.state = JobState::Failed;
                JobResult::failure(rjob, e.to_string())
            }
        }
    }

    fn drive(&self, job: &mut ReconciliationJob) -> Result<Option<PathBuf>, ReconcileError> {
        let descriptor = match parse_descriptor(&job.source_path, self.layout.kind()) {
            Ok(d) => d,
            Err(e) => {
                self.release_unparsable(&job.source_path);
                return Err(e.into());
            }
        };
        info!(
            name = %descriptor.declared_name,
            size = descriptor.declared_size_bytes,
            "Parsed descriptor"
        );

        if let Some(observer) = &self.observer {
            observer.descriptor_parsed(&descriptor);
        }
        job.descriptor = Some(descriptor.clone());

        let processing_path = self
            .move_to_processing(&job.source_path)
            .map_err(ReconcileError::Move)?;
        job.processing_path = Some(processing_path.clone());
        job.advance(JobState::Moved);

        job.advance(JobState::Searching);
        let found = self
            .search
            .find(&descriptor.declared_name, descriptor.declared_size_bytes);

        let Some(found) = found else {
            job.advance(JobState::Unmatched);
            info!(name = %descriptor.declared_name, "No matching file on the content mount");
            self.cleanup(&processing_path);
            return Ok(None);
        };

        job.matched_path = Some(found.clone());
        job.advance(JobState::Matched);

        let published = self.publisher.publish(&descriptor.declared_name, &found);
        self.cleanup(&processing_path);
        let link = published.map_err(ReconcileError::Publish)?;

        info!(
            target_file = %found.display(),
            link = %redact_path(&link),
            "Published match"
        );
        Ok(Some(link))
    }

    /// Renames the descriptor into `processing/`. A descriptor already there
    /// (recovered after a restart) stays where it is.
    fn move_to_processing(&self, source: &Path) -> Result<PathBuf, StorageError> {
        if self.layout.is_in_processing(source) {
            debug!("Resuming descriptor already in processing");
            return Ok(source.to_path_buf());
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| StorageError::InvalidName(source.display().to_string()))?;
        let destination = self.layout.processing().join(file_name);

        std::fs::rename(source, &destination).map_err(|e| StorageError::MoveFile {
            from: source.to_path_buf(),
            to: destination.clone(),
            source: e,
        })?;

        Ok(destination)
    }

    /// An unparsable descriptor found in `processing/` goes back to intake for
    /// inspection. Intake descriptors are left where they are.
    fn release_unparsable(&self, source: &Path) {
        if !self.layout.is_in_processing(source) {
            return;
        }
        let Some(file_name) = source.file_name() else {
            return;
        };
        let destination = self.layout.intake().join(file_name);
        if let Err(e) = std::fs::rename(source, &destination) {
            warn!("Could not return {} to intake: {}", redact_path(source), e);
        }
    }

    fn cleanup(&self, processing_path: &Path) {
        if let Err(e) = std::fs::remove_file(processing_path) {
            let err = StorageError::RemoveFile {
                path: processing_path.to_path_buf(),
                source: e,
            };
            warn!("Cleanup failed: {}", err);
        }
    }
}
