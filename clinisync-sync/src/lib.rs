//! Merge orchestration and sync passes for clinisync.
//!
//! # Architecture
//!
//! - [`MergeRule`]: per-resource lookup and combination logic ([`rules`])
//! - [`MergeOrchestrator`]: read existing → combine → diff → upsert, inside
//!   one store transaction per record
//! - [`PendingQueue`]: records whose parent entity is not stored yet
//! - [`SyncEngine`]: fetches every resource concurrently and merges batches
//!   as they arrive, producing a [`SyncReport`]
//!
//! Merge outcomes are [`MergeOutcome::Applied`], [`MergeOutcome::SkippedEmpty`]
//! (nothing to write) or [`MergeOutcome::SkippedMissingDependency`] (retry
//! once the parent exists). Only real failures are errors.

mod engine;
mod error;
mod job;
mod orchestrator;
mod pending;
mod report;
mod rule;
pub mod rules;

pub use engine::{SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use job::MergeJob;
pub use orchestrator::{MergeOrchestrator, MergeOutcome};
pub use pending::{Dependency, DependencyKind, Pending, PendingQueue};
pub use report::{MergeFailure, ResourceReport, SyncReport};
pub use rule::{Combined, MergeRule, SyncEntity};
