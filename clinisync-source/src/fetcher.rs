//! Concurrent pagination over a [`PageSource`].

use crate::http::{HttpPageSource, HttpSourceConfig};
use crate::limiter::RateLimiter;
use crate::source::PageSource;
use crate::{Query, SourceError, SourceResult};
use clinisync_types::Deadline;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Response field holding the number of matching records.
pub const TOTAL_FIELD: &str = "total_entries";

/// One page of a listing response, still unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 1-based page number.
    pub page: u64,
    pub body: String,
}

#[derive(Deserialize)]
struct PageHeader {
    total_entries: Option<u64>,
}

impl RawPage {
    /// Total number of records across all pages.
    pub fn total_entries(&self) -> SourceResult<u64> {
        let header: PageHeader = serde_json::from_str(&self.body)?;
        header
            .total_entries
            .ok_or_else(|| SourceError::MissingField(TOTAL_FIELD.to_string()))
    }

    /// Deserializes the array held in `field`.
    pub fn items<T: DeserializeOwned>(&self, field: &str) -> SourceResult<Vec<T>> {
        let mut body: Map<String, Value> = serde_json::from_str(&self.body)?;
        let items = body
            .remove(field)
            .ok_or_else(|| SourceError::MissingField(field.to_string()))?;
        Ok(serde_json::from_value(items)?)
    }
}

/// Fetches every page of a listing resource.
///
/// Page 1 is fetched first; its record count decides how many more pages
/// exist, and those are then requested concurrently. Every request waits for
/// the shared [`RateLimiter`]. Any failed page fails the whole fetch.
#[derive(Clone)]
pub struct PaginatedFetcher {
    source: Arc<dyn PageSource>,
    limiter: RateLimiter,
    per_page: u64,
}

impl PaginatedFetcher {
    pub fn new(
        source: Arc<dyn PageSource>,
        limiter: RateLimiter,
        per_page: u64,
    ) -> SourceResult<Self> {
        if per_page == 0 {
            return Err(SourceError::Config("per_page must be non-zero".into()));
        }
        Ok(Self {
            source,
            limiter,
            per_page,
        })
    }

    /// Builds an HTTP-backed fetcher from configuration.
    pub fn from_config(config: HttpSourceConfig) -> SourceResult<Self> {
        let limiter = RateLimiter::new(config.rate_limit, config.rate_interval())?;
        let per_page = config.per_page;
        Self::new(Arc::new(HttpPageSource::new(config)?), limiter, per_page)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetches all pages of `resource`, page 1 first and the rest in any
    /// order.
    pub async fn fetch_all(
        &self,
        resource: &str,
        query: &Query,
        deadline: Deadline,
    ) -> SourceResult<Vec<RawPage>> {
        let first = self.fetch_page(resource, query, 1, deadline).await?;
        let total = first.total_entries()?;
        let last_page = total.div_ceil(self.per_page);

        let rest = try_join_all(
            (2..=last_page).map(|page| self.fetch_page(resource, query, page, deadline)),
        )
        .await?;

        info!(
            "Fetched {} ({} entries, {} pages)",
            resource,
            total,
            last_page.max(1)
        );

        let mut pages = Vec::with_capacity(rest.len() + 1);
        pages.push(first);
        pages.extend(rest);
        Ok(pages)
    }

    /// Fetches all pages of `resource` and deserializes the records held in
    /// `items_field` of each.
    pub async fn fetch_records<T: DeserializeOwned>(
        &self,
        resource: &str,
        items_field: &str,
        query: &Query,
        deadline: Deadline,
    ) -> SourceResult<Vec<T>> {
        let pages = self.fetch_all(resource, query, deadline).await?;
        let mut records = Vec::new();
        for page in &pages {
            records.extend(page.items::<T>(items_field)?);
        }
        Ok(records)
    }

    async fn fetch_page(
        &self,
        resource: &str,
        query: &Query,
        page: u64,
        deadline: Deadline,
    ) -> SourceResult<RawPage> {
        let request = self
            .source
            .get_page(resource, query, page, self.per_page, deadline);
        let body = deadline.run(self.limiter.run(request)).await??;
        debug!("Fetched {} page {} ({} bytes)", resource, page, body.len());
        Ok(RawPage { page, body })
    }
}
