use std::path::PathBuf;

use crate::reconcile::{JobState, ReconciliationJob};

/// A discovered descriptor queued for reconciliation.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_path: PathBuf,
}

impl Job {
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path,
        }
    }
}

/// Terminal report of one reconciliation job.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub source_path: PathBuf,
    pub state: JobState,
    pub declared_name: Option<String>,
    pub matched_path: Option<PathBuf>,
    pub published_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn finished(job: ReconciliationJob, published_path: Option<PathBuf>) -> Self {
        Self {
            job_id: job.id,
            source_path: job.source_path,
            state: job.state,
            declared_name: job.descriptor.map(|d| d.declared_name),
            matched_path: job.matched_path,
            published_path,
            error: None,
        }
    }

    pub fn failure(job: ReconciliationJob, error: String) -> Self {
        Self {
            job_id: job.id,
            source_path: job.source_path,
            state: JobState::Failed,
            declared_name: job.descriptor.map(|d| d.declared_name),
            matched_path: job.matched_path,
            published_path: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
