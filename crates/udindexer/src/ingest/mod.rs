//! Catalog ingestion of parsed descriptors.

pub mod pipeline;
pub mod service;

pub use pipeline::{IngestOutcome, IngestionPipeline};
pub use service::{IngestStats, IngestionHandle, IngestionService};
