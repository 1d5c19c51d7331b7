//! Core type definitions for fieldstack.
//!
//! This crate defines the small, storage-agnostic types shared by every
//! other crate in the workspace:
//! - Owner and attribute-value identifiers (UUID v7)
//! - Field definition identifiers (admin-assigned integers)
//! - Millisecond timestamps with a monotonic `touch`

mod ids;
mod timestamp;

pub use ids::{FieldId, OwnerId, ValueId};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid field id: {0:?}")]
    InvalidFieldId(String),
}
