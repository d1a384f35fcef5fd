use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping persisted between sync passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Lower bound for the next incremental pass: when the last complete
    /// pass started, or earlier while records are still deferred. Incremental
    /// passes request records updated at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncMetadata {
    /// Singleton name in the store.
    pub const NAME: &'static str = "sync_metadata";
}
