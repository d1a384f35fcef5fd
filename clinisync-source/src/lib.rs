//! Upstream access for clinisync.
//!
//! - [`RateLimiter`]: trickle-refill permits shared by every request
//! - [`PageSource`]: one page of a listing resource; [`HttpPageSource`] talks
//!   to the REST API
//! - [`PaginatedFetcher`]: reads page 1, then the remaining pages concurrently
//!
//! Every fetch takes a [`Deadline`](clinisync_types::Deadline) that bounds
//! rate-limiter waits and HTTP requests alike. No call retries; retry policy
//! belongs to the caller.

mod error;
mod fetcher;
mod http;
mod limiter;
mod query;
mod source;

pub use error::{SourceError, SourceResult};
pub use fetcher::{PaginatedFetcher, RawPage, TOTAL_FIELD};
pub use http::{HttpPageSource, HttpSourceConfig};
pub use limiter::RateLimiter;
pub use query::{Query, FILTER_KEY};
pub use source::PageSource;
