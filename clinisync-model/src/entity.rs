use clinisync_diff::Diffable;
use clinisync_types::ExternalId;
use serde::{de::DeserializeOwned, Serialize};

/// A document kept in the local store.
///
/// The storage id is held by the store, not by the entity body, so diffs
/// never touch it.
pub trait Entity: Diffable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Store collection holding this entity kind.
    const COLLECTION: &'static str;

    /// Id of the upstream record this entity was built from.
    fn external_id(&self) -> ExternalId;

    /// Human-readable label for logs.
    fn label(&self) -> &str;
}
