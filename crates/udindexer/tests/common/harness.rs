//! Test harness for isolated reconciliation and ingestion runs.
//!
//! The `TestHarness` owns a temporary tree with a watch base (one intake
//! layout per source), a content mount and an in-memory catalog.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use udindexer::reconcile::DescriptorObserver;
use udindexer::{
    Database, IngestionPipeline, Job, JobResult, MetadataEnricher, MetadataProvider,
    ReconcileEngine, ReleaseNameClassifier, SourceKind, SourceLayout,
};

use super::NzbBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub base_dir: PathBuf,
    pub mount_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_dir = temp_dir.path().join("blackhole");
        let mount_dir = temp_dir.path().join("mount");
        std::fs::create_dir_all(&base_dir).expect("Failed to create base dir");
        std::fs::create_dir_all(&mount_dir).expect("Failed to create mount dir");

        Self {
            temp_dir,
            base_dir,
            mount_dir,
            db: Database::open_in_memory().expect("Failed to open catalog"),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Bootstrapped layout for one source (`radarr` or `sonarr`).
    pub fn layout(&self, kind: SourceKind) -> SourceLayout {
        let name = match kind {
            SourceKind::Movie => "radarr",
            SourceKind::Series => "sonarr",
        };
        let layout = SourceLayout::new(kind, self.base_dir.join(name));
        layout.bootstrap().expect("Failed to bootstrap layout");
        layout
    }

    pub fn engine(&self, kind: SourceKind) -> ReconcileEngine {
        ReconcileEngine::new(self.layout(kind), &self.mount_dir)
    }

    pub fn engine_with_observer(
        &self,
        kind: SourceKind,
        observer: Arc<dyn DescriptorObserver>,
    ) -> ReconcileEngine {
        self.engine(kind).with_observer(observer)
    }

    pub fn pipeline(&self, provider: Arc<dyn MetadataProvider>) -> IngestionPipeline {
        let enricher = Arc::new(MetadataEnricher::new(provider, Duration::from_secs(60)));
        IngestionPipeline::new(
            self.db.clone(),
            Arc::new(ReleaseNameClassifier::new()),
            enricher,
        )
    }

    /// Creates a sparse file of `len` bytes under the content mount.
    pub fn mount_file(&self, relative: &str, len: u64) -> PathBuf {
        let path = self.mount_dir.join(relative);
        std::fs::create_dir_all(path.parent().expect("mount file has a parent"))
            .expect("Failed to create mount subdirectory");
        File::create(&path)
            .and_then(|f| f.set_len(len))
            .expect("Failed to create mount file");
        path
    }

    /// Drops a descriptor into a source's intake root.
    pub fn drop_descriptor(&self, kind: SourceKind, filename: &str, nzb: &NzbBuilder) -> PathBuf {
        let path = self.layout(kind).intake().join(filename);
        std::fs::write(&path, nzb.build()).expect("Failed to write descriptor");
        path
    }

    pub fn reconcile(&self, engine: &ReconcileEngine, path: &Path) -> JobResult {
        engine.run(&Job::new(path.to_path_buf()))
    }

    pub fn completed_entries(&self, kind: SourceKind) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.layout(kind).completed())
            .expect("Failed to read completed dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn processing_entries(&self, kind: SourceKind) -> usize {
        std::fs::read_dir(self.layout(kind).processing())
            .expect("Failed to read processing dir")
            .count()
    }
}
