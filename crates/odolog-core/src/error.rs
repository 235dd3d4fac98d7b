//! Error types for odolog-core.

use crate::migration::MigrationError;

/// Result type for odolog-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the entity services and importer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Form input was malformed or out of range. Raised before any store
    /// call, so a validation failure never partially writes.
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The supplied amount disagrees with quantity x price beyond the
    /// rounding tolerance.
    #[error("Amount {amount:.2} does not match quantity x price ({expected:.2})")]
    Consistency {
        /// The amount as supplied.
        amount: f64,
        /// The product of quantity and price per unit.
        expected: f64,
    },

    /// A batch operation aborted partway through. State has been rolled
    /// back; `completed` names how many items had succeeded before the
    /// failure.
    #[error("Batch aborted after {completed} items: {source}")]
    Batch {
        /// Items that had completed before the failure.
        completed: usize,
        /// The failure that aborted the batch.
        #[source]
        source: Box<Error>,
    },

    /// Error from the record store.
    #[error(transparent)]
    Store(#[from] odolog_store::Error),

    /// Error from the migration importer.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
