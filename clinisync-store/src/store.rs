use crate::documents::{self, SCHEMA};
use crate::{StoreError, StoreResult, StoredDocument, TxControl, WriteOutcome};
use clinisync_diff::Patch;
use clinisync_types::StorageId;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Document store backed by SQLite.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::init(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Reads a document by storage id.
    pub fn get(&self, collection: &str, id: StorageId) -> StoreResult<Option<StoredDocument>> {
        documents::get(&*self.lock()?, collection, id)
    }

    /// Returns the first document whose field at `path` equals `value`.
    /// The path [`ID_FIELD`](crate::ID_FIELD) matches the storage id.
    pub fn find_by_field(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> StoreResult<Option<StoredDocument>> {
        documents::find_by_field(&*self.lock()?, collection, path, value)
    }

    /// Returns every document in a collection, oldest first.
    pub fn list(&self, collection: &str) -> StoreResult<Vec<StoredDocument>> {
        documents::list(&*self.lock()?, collection)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        documents::count(&*self.lock()?, collection)
    }

    /// Applies `patch` to the document `id`, creating it first if it does not
    /// exist and `upsert` is set.
    pub fn update_or_insert(
        &self,
        collection: &str,
        id: StorageId,
        patch: &Patch,
        upsert: bool,
    ) -> StoreResult<WriteOutcome> {
        documents::update_or_insert(&*self.lock()?, collection, id, patch, upsert)
    }

    /// Creates an expression index so lookups on `path` avoid a scan.
    pub fn ensure_index(&self, collection: &str, path: &str) -> StoreResult<()> {
        documents::ensure_index(&*self.lock()?, collection, path)
    }

    pub fn get_singleton<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        documents::get_singleton(&*self.lock()?, name)
    }

    pub fn put_singleton<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        documents::put_singleton(&*self.lock()?, name, value)
    }

    /// Runs `f` inside an immediate (write-locking) transaction.
    ///
    /// Commits on `Ok(TxControl::Commit(_))`; rolls back on
    /// `Ok(TxControl::Abort(_))` or `Err(_)`. The connection stays locked for
    /// the whole call, so `f` must not block on async work.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&StoreTx<'_>) -> Result<TxControl<T>, E>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let scope = StoreTx { tx };

        match f(&scope) {
            Ok(TxControl::Commit(value)) => {
                scope.tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Ok(TxControl::Abort(value)) => {
                scope.tx.rollback().map_err(StoreError::from)?;
                debug!("Transaction aborted");
                Ok(value)
            }
            Err(e) => {
                // Dropping the transaction rolls it back.
                drop(scope);
                Err(e)
            }
        }
    }
}

/// Store operations inside a transaction started by
/// [`DocumentStore::with_transaction`].
pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn get(&self, collection: &str, id: StorageId) -> StoreResult<Option<StoredDocument>> {
        documents::get(&self.tx, collection, id)
    }

    pub fn find_by_field(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> StoreResult<Option<StoredDocument>> {
        documents::find_by_field(&self.tx, collection, path, value)
    }

    pub fn update_or_insert(
        &self,
        collection: &str,
        id: StorageId,
        patch: &Patch,
        upsert: bool,
    ) -> StoreResult<WriteOutcome> {
        documents::update_or_insert(&self.tx, collection, id, patch, upsert)
    }
}
