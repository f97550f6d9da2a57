//! Error types for proposal intake.

use thiserror::Error;

/// Why a single inbound operation was refused.
///
/// Only the offending operation is dropped; the rest of its batch is still
/// processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Unknown operation type `{0}`")]
    UnknownType(String),

    #[error("Field `{field}` must be non-negative, got {value}")]
    NegativeOffset { field: &'static str, value: i64 },

    #[error("Invalid range: start ({start}) > end ({end})")]
    InvertedRange { start: usize, end: usize },

    #[error("Malformed operation: {0}")]
    Malformed(String),
}

/// A proposal message that could not be read at all.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid proposal message: {0}")]
    Json(#[from] serde_json::Error),
}
