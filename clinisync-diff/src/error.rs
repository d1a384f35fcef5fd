//! Error types for diffing and patch application.

use crate::NodeKind;
use thiserror::Error;

/// Result type for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors that can occur while diffing or applying patches.
///
/// All of these indicate a schema or programming error, never a transient
/// condition. Callers must not retry them.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Old and new values at the same path have incompatible kinds.
    #[error("kind mismatch at `{path}`: old is {old}, new is {new}")]
    KindMismatch {
        path: String,
        old: NodeKind,
        new: NodeKind,
    },

    /// A map key cannot be used as a path segment.
    #[error("invalid map key at `{path}`: {key:?}")]
    InvalidKey { path: String, key: String },

    /// Two elements of an identity list share a diff key.
    #[error("duplicate diff key {key:?} in list at `{path}`")]
    DuplicateKey { path: String, key: String },

    /// A patch path runs through a value that cannot hold children.
    #[error("cannot apply `{path}`: `{blocked_at}` is not an object or array")]
    PathConflict { path: String, blocked_at: String },

    /// Serialization error while converting a node to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
