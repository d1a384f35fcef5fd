//! Type-erased records and resources, so one engine can drive every rule.

use crate::orchestrator::{MergeOrchestrator, MergeOutcome};
use crate::pending::Pending;
use crate::rule::MergeRule;
use crate::SyncResult;
use clinisync_model::records::SourceRecord;
use clinisync_model::Entity;
use clinisync_source::{PaginatedFetcher, Query, SourceResult};
use chrono::{DateTime, Utc};
use clinisync_types::{Deadline, ExternalId};
use futures::future::BoxFuture;
use std::sync::Arc;

trait ErasedMerge: Send + Sync {
    fn resource(&self) -> &'static str;
    fn record_id(&self) -> ExternalId;
    fn merge<'a>(
        &'a self,
        orchestrator: &'a MergeOrchestrator,
        deadline: Deadline,
    ) -> BoxFuture<'a, SyncResult<MergeOutcome>>;
}

struct Bound<R: MergeRule> {
    rule: R,
    record: R::Record,
}

impl<R: MergeRule> ErasedMerge for Bound<R> {
    fn resource(&self) -> &'static str {
        self.rule.name()
    }

    fn record_id(&self) -> ExternalId {
        self.rule.record_id(&self.record)
    }

    fn merge<'a>(
        &'a self,
        orchestrator: &'a MergeOrchestrator,
        deadline: Deadline,
    ) -> BoxFuture<'a, SyncResult<MergeOutcome>> {
        Box::pin(orchestrator.merge(&self.rule, &self.record, deadline))
    }
}

/// A fetched record bound to the rule that merges it.
#[derive(Clone)]
pub struct MergeJob {
    inner: Arc<dyn ErasedMerge>,
    fetched_since: Option<DateTime<Utc>>,
}

impl MergeJob {
    pub fn new<R: MergeRule>(rule: R, record: R::Record) -> Self {
        Self {
            inner: Arc::new(Bound { rule, record }),
            fetched_since: None,
        }
    }

    /// Records the `updated_at` lower bound of the fetch that returned this
    /// record. `None` means an unfiltered fetch.
    #[must_use]
    pub fn with_fetched_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.fetched_since = since;
        self
    }

    /// A fetch from this bound returns the record again.
    pub fn fetched_since(&self) -> Option<DateTime<Utc>> {
        self.fetched_since
    }

    pub fn resource(&self) -> &'static str {
        self.inner.resource()
    }

    pub fn record_id(&self) -> ExternalId {
        self.inner.record_id()
    }

    pub async fn merge(
        &self,
        orchestrator: &MergeOrchestrator,
        deadline: Deadline,
    ) -> SyncResult<MergeOutcome> {
        self.inner.merge(orchestrator, deadline).await
    }
}

impl Pending for MergeJob {
    fn pending_key(&self) -> (&'static str, ExternalId) {
        (self.resource(), self.record_id())
    }
}

impl std::fmt::Debug for MergeJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MergeJob({} {})", self.resource(), self.record_id())
    }
}

/// A resource the engine fetches and merges.
pub(crate) trait Feed: Send + Sync {
    fn resource(&self) -> &'static str;

    /// Collection and field looked up by every merge of this resource.
    fn index(&self) -> (&'static str, &'static str);

    fn query(&self) -> Query;

    fn fetch(
        &self,
        fetcher: PaginatedFetcher,
        query: Query,
        deadline: Deadline,
    ) -> BoxFuture<'static, SourceResult<Vec<MergeJob>>>;
}

pub(crate) struct RuleFeed<R>(pub(crate) R);

impl<R: MergeRule> Feed for RuleFeed<R> {
    fn resource(&self) -> &'static str {
        self.0.name()
    }

    fn index(&self) -> (&'static str, &'static str) {
        (R::Entity::COLLECTION, self.0.lookup_field())
    }

    fn query(&self) -> Query {
        self.0.query()
    }

    fn fetch(
        &self,
        fetcher: PaginatedFetcher,
        query: Query,
        deadline: Deadline,
    ) -> BoxFuture<'static, SourceResult<Vec<MergeJob>>> {
        let rule = self.0.clone();
        Box::pin(async move {
            let records: Vec<R::Record> = fetcher
                .fetch_records(rule.name(), R::Record::RESOURCE, &query, deadline)
                .await?;
            Ok(records
                .into_iter()
                .map(|record| MergeJob::new(rule.clone(), record))
                .collect())
        })
    }
}
