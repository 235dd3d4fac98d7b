//! Error types for odolog-store.

use std::path::PathBuf;

/// Result type for odolog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in odolog-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store was used before `init()` completed.
    #[error("Store not initialized: call init() first")]
    NotInitialized,

    /// Database error from the embedded SQLite engine.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The target row of an update/delete does not exist.
    #[error("Not found in {table}: {id}")]
    NotFound {
        /// Table the lookup ran against.
        table: &'static str,
        /// The missing row id.
        id: String,
    },

    /// A dependent row references a vehicle that does not exist.
    #[error("Vehicle not found for {table} row: {vehicle_id}")]
    ForeignKey {
        /// Table the insert/update ran against.
        table: &'static str,
        /// The dangling vehicle id.
        vehicle_id: String,
    },

    /// Failed to create the database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
