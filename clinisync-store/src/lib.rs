//! SQLite document store for clinisync.
//!
//! Documents are JSON bodies grouped into collections and addressed by a
//! [`StorageId`]. Writes are expressed as [`Patch`](clinisync_diff::Patch)es,
//! applied with set/unset semantics, so locally-owned fields that a patch does
//! not mention are never touched.
//!
//! # Architecture
//!
//! - `documents(collection, id, version, body, updated_at)` holds every entity
//! - `singletons(name, body, updated_at)` holds one-off records such as sync
//!   metadata
//! - Lookups by nested field use SQLite's `json_extract`
//! - [`DocumentStore::with_transaction`] runs read → diff → write under one
//!   `BEGIN IMMEDIATE` transaction, serializing concurrent merges of the same
//!   document
//!
//! The store is synchronous. Async callers run it inside
//! `tokio::task::spawn_blocking`.

mod documents;
mod error;
mod query;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{DocumentStore, StoreTx};

use clinisync_types::StorageId;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Field path that addresses the storage id column.
pub const ID_FIELD: &str = "_id";

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: StorageId,
    /// Incremented on every write; 1 after insert.
    pub version: i64,
    pub body: Value,
}

impl StoredDocument {
    /// Deserializes the body into an entity type.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Result of [`DocumentStore::update_or_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No document existed; one was created.
    Inserted,
    /// An existing document was patched.
    Updated,
    /// The patch deleted the whole document.
    Deleted,
    /// No document existed and upsert was off.
    NotFound,
}

/// What a transaction body wants done with its work.
#[derive(Debug, Clone, PartialEq)]
pub enum TxControl<T> {
    /// Commit and return the value.
    Commit(T),
    /// Roll back and return the value.
    Abort(T),
}
