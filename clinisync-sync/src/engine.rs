//! Sync engine: one pass fetches every resource and merges it into the
//! store.
//!
//! All resources are fetched concurrently. Each batch is merged as soon as
//! its fetch finishes, so child records routinely arrive before their
//! parents; those are parked in a [`PendingQueue`] and retried as soon as a
//! merge stores the parent they wait for.

use crate::job::{Feed, MergeJob, RuleFeed};
use crate::orchestrator::{MergeOrchestrator, MergeOutcome};
use crate::pending::PendingQueue;
use crate::report::{MergeFailure, SyncReport};
use crate::rule::MergeRule;
use crate::rules::{
    AppointmentRule, AppointmentTypeRule, AttendeeRule, CaseRule, PatientRule, PractitionerRule,
    ReferenceNumberRule, UserRule,
};
use crate::SyncResult;
use chrono::Utc;
use clinisync_model::SyncMetadata;
use clinisync_source::PaginatedFetcher;
use clinisync_store::DocumentStore;
use clinisync_types::Deadline;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Configuration for sync passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deadline for fetching every page of every resource.
    pub fetch_timeout_secs: u64,
    /// Deadline for a single record merge.
    pub merge_timeout_secs: u64,
    /// Merges run concurrently within a batch.
    pub merge_concurrency: usize,
    /// Only request records updated since the last successful pass.
    pub incremental: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 600,
            merge_timeout_secs: 30,
            merge_concurrency: 8,
            incremental: false,
        }
    }
}

impl SyncConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn merge_timeout(&self) -> Duration {
        Duration::from_secs(self.merge_timeout_secs)
    }
}

/// Drives sync passes from upstream into the store.
pub struct SyncEngine {
    config: SyncConfig,
    fetcher: PaginatedFetcher,
    orchestrator: MergeOrchestrator,
    feeds: Vec<Arc<dyn Feed>>,
    /// Records deferred by earlier merges, kept across passes.
    pending: Mutex<PendingQueue<MergeJob>>,
}

impl SyncEngine {
    /// Creates an engine syncing every supported resource.
    pub fn new(config: SyncConfig, fetcher: PaginatedFetcher, store: DocumentStore) -> Self {
        Self::empty(config, fetcher, store)
            .with_rule(AppointmentTypeRule)
            .with_rule(PatientRule)
            .with_rule(CaseRule)
            .with_rule(AppointmentRule)
            .with_rule(AttendeeRule)
            .with_rule(PractitionerRule)
            .with_rule(UserRule)
            .with_rule(ReferenceNumberRule)
    }

    /// Creates an engine with no resources registered.
    pub fn empty(config: SyncConfig, fetcher: PaginatedFetcher, store: DocumentStore) -> Self {
        Self {
            config,
            fetcher,
            orchestrator: MergeOrchestrator::new(store),
            feeds: Vec::new(),
            pending: Mutex::new(PendingQueue::new()),
        }
    }

    /// Registers a resource.
    #[must_use]
    pub fn with_rule<R: MergeRule>(mut self, rule: R) -> Self {
        self.feeds.push(Arc::new(RuleFeed(rule)));
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Registered resource names, in registration order.
    pub fn resources(&self) -> Vec<&'static str> {
        self.feeds.iter().map(|feed| feed.resource()).collect()
    }

    /// Records waiting for a parent.
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingQueue<MergeJob>> {
        // The queue is only mutated between awaits; a poisoned guard still
        // holds a consistent queue.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self) -> DocumentStore {
        self.orchestrator.store().clone()
    }

    /// Creates the store indexes every lookup relies on.
    pub async fn prepare(&self) -> SyncResult<()> {
        let indexes: BTreeSet<_> = self.feeds.iter().map(|feed| feed.index()).collect();
        let store = self.store();
        tokio::task::spawn_blocking(move || -> SyncResult<()> {
            for (collection, field) in indexes {
                store.ensure_index(collection, field)?;
            }
            Ok(())
        })
        .await?
    }

    /// Runs one full (or incremental) pass.
    ///
    /// Fetch failures and merge failures are recorded in the report and do
    /// not stop other resources or records. The pass start time is stored as
    /// the next incremental lower bound only when nothing failed. While
    /// records are still deferred the bound is held back to the earliest
    /// fetch that returned one of them.
    pub async fn run_pass(&self) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        self.prepare().await?;

        let store = self.store();
        let metadata: SyncMetadata = tokio::task::spawn_blocking(move || {
            store.get_singleton::<SyncMetadata>(SyncMetadata::NAME)
        })
        .await??
        .unwrap_or_default();

        let since = if self.config.incremental {
            metadata.last_sync
        } else {
            None
        };
        let mut report = SyncReport::new(started_at, since);

        match since {
            Some(since) => info!("Starting incremental sync pass (since {})", since),
            None => info!("Starting full sync pass"),
        }

        // Parents may have arrived by other means since the last pass.
        let leftovers = self.lock_pending().drain();
        if !leftovers.is_empty() {
            debug!("Retrying {} deferred records", leftovers.len());
            self.merge_all(leftovers, &mut report).await;
        }

        let deadline = Deadline::after(self.config.fetch_timeout());
        let mut fetches = JoinSet::new();
        for feed in &self.feeds {
            let mut query = feed.query();
            if let Some(since) = since {
                query = query.updated_since(since);
            }
            let resource = feed.resource();
            report.resource_mut(resource);
            let fetch = feed.fetch(self.fetcher.clone(), query, deadline);
            fetches.spawn(async move { (resource, fetch.await) });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((resource, Ok(jobs))) => {
                    debug!("Merging {} {} records", jobs.len(), resource);
                    report.resource_mut(resource).fetched = jobs.len();
                    let jobs = jobs
                        .into_iter()
                        .map(|job| job.with_fetched_since(since))
                        .collect();
                    self.merge_all(jobs, &mut report).await;
                }
                Ok((resource, Err(e))) => {
                    warn!("Failed to fetch {}: {}", resource, e);
                    report.resource_mut(resource).fetch_error = Some(e.to_string());
                }
                Err(e) => {
                    warn!("Fetch task failed: {}", e);
                    report.errors.push(format!("fetch task failed: {e}"));
                }
            }
        }

        // A parent can be stored while a dependent merge is in flight, after
        // that merge already looked it up; sweep once more.
        let leftovers = self.lock_pending().drain();
        if !leftovers.is_empty() {
            self.merge_all(leftovers, &mut report).await;
        }

        // Deferred records only live in this engine. The next incremental
        // bound must still cover them so a fresh process fetches them again.
        let mut last_sync = Some(started_at);
        for (_, job) in self.lock_pending().iter() {
            report.resource_mut(job.resource()).pending += 1;
            last_sync = last_sync.min(job.fetched_since());
        }

        if report.is_success() {
            if last_sync != Some(started_at) {
                warn!(
                    "{} records still deferred; holding sync time at {:?}",
                    report.pending(),
                    last_sync
                );
            }
            let store = self.store();
            let metadata = SyncMetadata { last_sync };
            tokio::task::spawn_blocking(move || {
                store.put_singleton(SyncMetadata::NAME, &metadata)
            })
            .await??;
        } else {
            warn!("Sync pass had failures; keeping previous sync time");
        }

        info!(
            "Sync pass finished: {} applied, {} unchanged, {} pending, {} failed",
            report.applied(),
            report.unchanged(),
            report.pending(),
            report.failed_merges() + report.failed_resources().len()
        );
        Ok(report)
    }

    /// Merges `jobs`, then anything their writes released, until no more
    /// work is unblocked.
    async fn merge_all(&self, jobs: Vec<MergeJob>, report: &mut SyncReport) {
        let merge_timeout = self.config.merge_timeout();
        let concurrency = self.config.merge_concurrency.max(1);
        let mut queue = jobs;

        while !queue.is_empty() {
            let batch = std::mem::take(&mut queue);
            let results: Vec<_> = stream::iter(batch)
                .map(|job| async move {
                    let outcome = job
                        .merge(&self.orchestrator, Deadline::after(merge_timeout))
                        .await;
                    (job, outcome)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            // Defer first so parents stored by this same batch release them.
            let mut satisfied = Vec::new();
            for (job, outcome) in results {
                match outcome {
                    Ok(MergeOutcome::Applied { satisfies, .. }) => {
                        report.resource_mut(job.resource()).applied += 1;
                        satisfied.extend(satisfies);
                    }
                    Ok(MergeOutcome::SkippedEmpty) => {
                        report.resource_mut(job.resource()).unchanged += 1;
                    }
                    Ok(MergeOutcome::SkippedMissingDependency(dependency)) => {
                        self.lock_pending().defer(dependency, job);
                    }
                    Err(e) => {
                        warn!(
                            "Failed to merge {} {}: {}",
                            job.resource(),
                            job.record_id(),
                            e
                        );
                        report
                            .resource_mut(job.resource())
                            .failures
                            .push(MergeFailure {
                                record_id: job.record_id(),
                                error: e.to_string(),
                            });
                    }
                }
            }

            let mut pending = self.lock_pending();
            for dependency in &satisfied {
                queue.extend(pending.release(dependency));
            }
        }
    }
}
