//! Error types for decoding persisted string forms.

use thiserror::Error;

/// Errors that can occur when decoding stored odolog data.
///
/// This error type covers the string-to-enum decoding used when reading
/// rows back from persistence or from a legacy snapshot; store and
/// service errors live in their own crates.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The stored vehicle type string is not one of `gas`, `electric`, `hybrid`.
    #[error("Unknown vehicle type: {0}")]
    UnknownVehicleType(String),

    /// The stored vehicle status string is not one of `active`, `inactive`.
    #[error("Unknown vehicle status: {0}")]
    UnknownVehicleStatus(String),
}

/// Result type alias using odolog-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
