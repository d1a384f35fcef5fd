//! Configuration and wiring for the `clinisync-runner` binary.

use anyhow::{Context, Result};
use clinisync_source::{HttpSourceConfig, PaginatedFetcher};
use clinisync_store::DocumentStore;
use clinisync_sync::{SyncConfig, SyncEngine, SyncReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a pass needs, loaded from one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// SQLite database file.
    pub database: PathBuf,
    #[serde(default)]
    pub source: HttpSourceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl RunnerConfig {
    /// Replaces the configured API key when one is given.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.source.api_key = key;
        }
        self
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<RunnerConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Opens the store and runs a single pass.
pub async fn run_once(config: RunnerConfig) -> Result<SyncReport> {
    info!("Opening store at {:?}", config.database);
    let store = DocumentStore::open(&config.database).context("Failed to open store")?;
    let fetcher =
        PaginatedFetcher::from_config(config.source).context("Invalid source configuration")?;
    let engine = SyncEngine::new(config.sync, fetcher, store);
    engine.run_pass().await.context("Sync pass failed")
}
