//! Intake watching: startup recovery scan plus a polling watch loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use tracing::{debug, error, info, info_span, warn};
use walkdir::WalkDir;

use crate::descriptor::is_descriptor_path;
use crate::error::WorkerError;
use crate::reconcile::SourceLayout;
use crate::worker::job::Job;

/// Watches one source's intake root for new descriptors.
pub struct IntakeWatcher {
    layout: SourceLayout,
    poll_interval: Duration,
}

impl IntakeWatcher {
    pub fn new(layout: SourceLayout, poll_interval: Duration) -> Self {
        Self {
            layout,
            poll_interval,
        }
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Descriptors left over from a previous run: interrupted ones in
    /// `processing/` first, then any already waiting in intake.
    pub fn scan_pending(&self) -> Result<Vec<Job>, WorkerError> {
        let mut jobs = top_level_descriptors(&self.layout.processing())?;
        let recovered = jobs.len();
        jobs.extend(top_level_descriptors(self.layout.intake())?);

        info!(
            source = %self.layout.kind(),
            recovered,
            waiting = jobs.len() - recovered,
            "Startup scan complete"
        );
        Ok(jobs.into_iter().map(Job::new).collect())
    }

    /// Maps one filesystem event path to the jobs it should produce.
    ///
    /// A descriptor file yields itself. A new directory (other than the
    /// reserved areas) yields the descriptors directly inside it. Anything
    /// else is ignored.
    pub fn jobs_for_event(&self, path: &Path) -> Vec<Job> {
        // The poller reports the intake root itself whenever its mtime moves.
        if path == self.layout.intake() || self.layout.is_reserved(path) {
            return Vec::new();
        }

        if path.is_dir() {
            return match top_level_descriptors(path) {
                Ok(found) => {
                    if !found.is_empty() {
                        info!("Directory {} holds {} descriptor(s)", path.display(), found.len());
                    }
                    found.into_iter().map(Job::new).collect()
                }
                Err(e) => {
                    warn!("Could not inspect {}: {}", path.display(), e);
                    Vec::new()
                }
            };
        }

        if path.is_file() && is_descriptor_path(path) {
            info!("New descriptor detected: {}", path.display());
            return vec![Job::new(path.to_path_buf())];
        }

        Vec::new()
    }

    /// Blocks until `shutdown` is set, handing every discovered job to `callback`.
    ///
    /// Leftover descriptors (see [`scan_pending`](Self::scan_pending)) are
    /// delivered first, once the watch is live.
    pub fn watch<F>(&self, callback: F, shutdown: Arc<AtomicBool>) -> Result<(), WorkerError>
    where
        F: Fn(Job) + Send + 'static,
    {
        let _span = info_span!("watch", source = %self.layout.kind()).entered();
        let intake = self.layout.intake().to_path_buf();

        // Use PollWatcher for Docker/NFS compatibility
        let poll_config = NotifyConfig::default().with_poll_interval(self.poll_interval);

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&intake, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", intake.display());

        // The poller has its baseline now, so anything already on disk is
        // only ever seen by this scan.
        for job in self.scan_pending()? {
            callback(job);
        }

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Watch mode shutting down...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::Any) {
                            for job in self.jobs_for_event(&event.path) {
                                callback(job);
                            }
                        }
                    }
                }
                Ok(Err(errors)) => {
                    warn!("Watch error: {:?}", errors);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn top_level_descriptors(dir: &Path) -> Result<Vec<PathBuf>, WorkerError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| WorkerError::ScanFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && is_descriptor_path(path) {
            debug!("Found descriptor: {}", path.display());
            found.push(path.to_path_buf());
        }
    }

    Ok(found)
}
