//! Core type definitions for clinisync.
//!
//! This crate defines the small, domain-agnostic types shared by every layer
//! of the sync engine:
//! - External identifiers assigned by the upstream practice-management system
//! - Storage identifiers (UUID v7) assigned by the local document store
//! - Caller-supplied deadlines for fetch and merge operations
//!
//! Entity shapes live in `clinisync-model`, not here.

mod deadline;
mod ids;

pub use deadline::{Deadline, DeadlineElapsed};
pub use ids::{ExternalId, StorageId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid external id: {0}")]
    InvalidExternalId(String),
}
