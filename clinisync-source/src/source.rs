//! Page source abstraction.

use crate::{Query, SourceResult};
use async_trait::async_trait;
use clinisync_types::Deadline;

/// Something that serves one page of a listing resource as raw JSON.
///
/// Implementations do not rate-limit; [`PaginatedFetcher`](crate::PaginatedFetcher)
/// gates every call.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches page `page` (1-based) of `resource`.
    async fn get_page(
        &self,
        resource: &str,
        query: &Query,
        page: u64,
        per_page: u64,
        deadline: Deadline,
    ) -> SourceResult<String>;
}
