use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Database error: {0}")]
    Database(#[from] crate::catalog::DatabaseError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] crate::enrich::EnrichmentError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting '{name}'")]
    Missing { name: &'static str },

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to resolve path '{path}': {source}")]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A descriptor that cannot be turned into a `JobDescriptor`. Never retried.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Failed to read descriptor '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed descriptor XML: {0}")]
    Xml(String),

    #[error("Descriptor declares no files")]
    NoFiles,

    #[error("Descriptor file is missing its subject")]
    MissingSubject,

    #[error("Segment has invalid byte count '{0}'")]
    InvalidSegmentBytes(String),

    #[error("Segment is missing its byte count")]
    MissingSegmentBytes,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create symlink from '{link}' to '{target}': {source}")]
    CreateSymlink {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid reference name: {0}")]
    InvalidName(String),
}

/// Why a reconciliation job ended in `Failed`.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to parse descriptor: {0}")]
    Parse(#[from] DescriptorError),

    #[error("Failed to move descriptor into processing: {0}")]
    Move(#[source] StorageError),

    #[error("Failed to publish match: {0}")]
    Publish(#[source] StorageError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
