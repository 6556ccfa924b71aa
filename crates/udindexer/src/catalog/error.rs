//! Catalog error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from catalog operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// An entry with the same `(filename, raw_size)` already exists.
    #[error("Release '{filename}' ({raw_size} bytes) is already cataloged")]
    DuplicateKey { filename: String, raw_size: u64 },

    /// A value does not fit the column type.
    #[error("Value out of range for column '{column}'")]
    OutOfRange { column: &'static str },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
