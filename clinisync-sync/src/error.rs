//! Error types for the sync layer.

use clinisync_types::ExternalId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetching from upstream failed.
    #[error("source error: {0}")]
    Source(#[from] clinisync_source::SourceError),

    /// Store read or write failed.
    #[error("store error: {0}")]
    Store(#[from] clinisync_store::StoreError),

    /// Diffing failed. Stored and rebuilt entities disagree in shape.
    #[error("diff error: {0}")]
    Diff(#[from] clinisync_diff::DiffError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller's deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A record lacks a link it needs to be merged.
    #[error("{resource} record {id} has no {field} link")]
    MissingReference {
        resource: &'static str,
        id: ExternalId,
        field: &'static str,
    },

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl From<clinisync_types::DeadlineElapsed> for SyncError {
    fn from(_: clinisync_types::DeadlineElapsed) -> Self {
        SyncError::DeadlineExceeded
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(e: tokio::task::JoinError) -> Self {
        SyncError::Task(e.to_string())
    }
}
