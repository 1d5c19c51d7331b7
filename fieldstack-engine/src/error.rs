//! Error types for the engine.

use fieldstack_model::FieldError;
use fieldstack_storage::StorageError;
use fieldstack_types::OwnerId;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reading, assigning or saving custom values.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The storage collaborator failed. Nothing was committed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation failed; the save was aborted before storage was contacted.
    #[error("validation failed with {} error(s)", .0.len())]
    Invalid(Vec<FieldError>),

    /// No record with this id exists.
    #[error("record not found: {0}")]
    RecordNotFound(OwnerId),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
