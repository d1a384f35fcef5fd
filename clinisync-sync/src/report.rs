use chrono::{DateTime, Utc};
use clinisync_types::ExternalId;
use serde::Serialize;
use std::collections::BTreeMap;

/// A record that failed to merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeFailure {
    pub record_id: ExternalId,
    pub error: String,
}

/// Per-resource results of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    /// Records fetched from upstream.
    pub fetched: usize,
    /// Merges that wrote a patch, including retried records.
    pub applied: usize,
    /// Merges that found nothing to change.
    pub unchanged: usize,
    /// Records still waiting for a parent when the pass ended.
    pub pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MergeFailure>,
}

impl ResourceReport {
    pub fn is_success(&self) -> bool {
        self.fetch_error.is_none() && self.failures.is_empty()
    }
}

/// Results of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    /// Lower bound on `updated_at` for incremental passes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub resources: BTreeMap<&'static str, ResourceReport>,
    /// Failures not tied to one resource.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new(started_at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> Self {
        Self {
            started_at,
            since,
            resources: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceReport> {
        self.resources.get(name)
    }

    pub(crate) fn resource_mut(&mut self, name: &'static str) -> &mut ResourceReport {
        self.resources.entry(name).or_default()
    }

    /// True when every fetch and every merge succeeded. Records still
    /// waiting for a parent do not count as failures.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.resources.values().all(ResourceReport::is_success)
    }

    pub fn applied(&self) -> usize {
        self.resources.values().map(|r| r.applied).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.resources.values().map(|r| r.unchanged).sum()
    }

    pub fn pending(&self) -> usize {
        self.resources.values().map(|r| r.pending).sum()
    }

    pub fn failed_merges(&self) -> usize {
        self.resources.values().map(|r| r.failures.len()).sum()
    }

    /// Resources whose fetch failed.
    pub fn failed_resources(&self) -> Vec<&'static str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.fetch_error.is_some())
            .map(|(name, _)| *name)
            .collect()
    }
}
