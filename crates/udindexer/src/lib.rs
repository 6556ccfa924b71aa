pub mod catalog;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod reconcile;
pub mod sanitize;
pub mod worker;

pub use catalog::{CatalogEntry, Database, DatabaseError, ReleaseFilter};
pub use classify::{classify_release, MediaType, ReleaseNameClassifier, TitleClassifier};
pub use config::{Settings, TmdbSettings};
pub use descriptor::{parse_descriptor, JobDescriptor, SourceKind};
pub use enrich::{Enrichment, EnrichmentError, MetadataEnricher, MetadataProvider, TmdbClient};
pub use error::{
    ConfigError, DescriptorError, IndexerError, ReconcileError, Result, StorageError, WorkerError,
};
pub use ingest::{IngestOutcome, IngestionHandle, IngestionPipeline, IngestionService};
pub use reconcile::{JobState, ReconcileEngine, SourceLayout};
pub use worker::{IntakeWatcher, Job, JobResult, WorkerPool};
