//! Merges one upstream record into the store.

use crate::pending::Dependency;
use crate::rule::{Combined, MergeRule, SyncEntity};
use crate::{SyncError, SyncResult};
use clinisync_diff::{diff, Patch};
use clinisync_model::Entity;
use clinisync_store::{DocumentStore, StoreTx, TxControl};
use clinisync_types::{Deadline, ExternalId, StorageId};
use tracing::{debug, info};

/// Result of merging one record.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The patch was written.
    Applied {
        storage_id: StorageId,
        patch: Patch,
        /// Dependencies the written entity now satisfies.
        satisfies: Vec<Dependency>,
    },
    /// The stored entity already matched; nothing was written.
    SkippedEmpty,
    /// The parent entity is not stored yet; nothing was written.
    SkippedMissingDependency(Dependency),
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeOutcome::Applied { .. })
    }

    pub fn patch(&self) -> Option<&Patch> {
        match self {
            MergeOutcome::Applied { patch, .. } => Some(patch),
            _ => None,
        }
    }
}

/// Runs read → combine → diff → write for single records.
///
/// Each merge happens inside one immediate store transaction, so two merges
/// of the same entity cannot lose each other's writes. Store work runs on
/// the blocking pool.
#[derive(Clone)]
pub struct MergeOrchestrator {
    store: DocumentStore,
}

impl MergeOrchestrator {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Merges `record` using `rule`.
    ///
    /// The deadline bounds the whole merge, including waiting for the store.
    /// It is also checked when the transaction starts and again right before
    /// the write; once it has passed the transaction rolls back with
    /// [`SyncError::DeadlineExceeded`].
    pub async fn merge<R: MergeRule>(
        &self,
        rule: &R,
        record: &R::Record,
        deadline: Deadline,
    ) -> SyncResult<MergeOutcome> {
        if deadline.is_expired() {
            return Err(SyncError::DeadlineExceeded);
        }
        let key = rule.lookup_key(record)?;

        let store = self.store.clone();
        let rule = rule.clone();
        let record = record.clone();
        // An abandoned blocking merge re-checks the deadline inside its
        // transaction and rolls back.
        let merge = tokio::task::spawn_blocking(move || {
            merge_blocking(&store, &rule, &record, key, deadline)
        });
        deadline.run(merge).await??
    }
}

fn merge_blocking<R: MergeRule>(
    store: &DocumentStore,
    rule: &R,
    record: &R::Record,
    key: ExternalId,
    deadline: Deadline,
) -> SyncResult<MergeOutcome> {
    let collection = R::Entity::COLLECTION;

    store.with_transaction(|tx| {
        if deadline.is_expired() {
            return Err(SyncError::DeadlineExceeded);
        }

        let existing = find_existing::<R::Entity>(tx, rule.lookup_field(), key)?;
        if existing.is_none() && !rule.allow_create() {
            let dependency = rule.missing(key);
            debug!(
                "Skipping {} {}: {} not stored yet",
                rule.name(),
                rule.record_id(record),
                dependency
            );
            return Ok(TxControl::Abort(MergeOutcome::SkippedMissingDependency(dependency)));
        }

        let current = existing.as_ref().map(|(_, entity)| entity);
        let updated = match rule.combine(record, current)? {
            Combined::Entity(entity) => entity,
            Combined::MissingDependency(dependency) => {
                debug!(
                    "Skipping {} {}: {} not stored yet",
                    rule.name(),
                    rule.record_id(record),
                    dependency
                );
                return Ok(TxControl::Abort(MergeOutcome::SkippedMissingDependency(
                    dependency,
                )));
            }
        };

        let patch = diff(current, Some(&updated))?;
        if patch.is_empty() {
            debug!("{} {} unchanged", rule.name(), rule.record_id(record));
            return Ok(TxControl::Abort(MergeOutcome::SkippedEmpty));
        }

        if deadline.is_expired() {
            return Err(SyncError::DeadlineExceeded);
        }

        let storage_id = existing.map_or_else(StorageId::new, |(id, _)| id);
        tx.update_or_insert(collection, storage_id, &patch, true)?;

        info!(
            "Updated {}/{} ({}) from {} {} ({} paths)",
            collection,
            storage_id,
            updated.label(),
            rule.name(),
            rule.record_id(record),
            patch.len()
        );

        Ok(TxControl::Commit(MergeOutcome::Applied {
            storage_id,
            patch,
            satisfies: updated.satisfies(),
        }))
    })
}

fn find_existing<E: SyncEntity>(
    tx: &StoreTx<'_>,
    field: &str,
    key: ExternalId,
) -> SyncResult<Option<(StorageId, E)>> {
    let found = tx.find_by_field(E::COLLECTION, field, &serde_json::json!(key.get()))?;
    match found {
        Some(doc) => Ok(Some((doc.id, doc.decode()?))),
        None => Ok(None),
    }
}
