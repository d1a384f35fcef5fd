//! HTTP page source for the upstream REST API.
//!
//! Authenticates with HTTP basic auth, using the API key as the user name and
//! an empty password.

use crate::source::PageSource;
use crate::{Query, SourceError, SourceResult};
use async_trait::async_trait;
use clinisync_types::Deadline;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Upstream API configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// API root, e.g. `https://api.au1.example.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    /// Records per page.
    pub per_page: u64,
    /// Requests allowed per `rate_interval_secs`.
    pub rate_limit: usize,
    pub rate_interval_secs: u64,
    /// Upper bound for a single request, applied even without a deadline.
    pub request_timeout_secs: u64,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            user_agent: format!("clinisync/{}", env!("CARGO_PKG_VERSION")),
            per_page: 100,
            rate_limit: 100,
            rate_interval_secs: 60,
            request_timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for HttpSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSourceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("per_page", &self.per_page)
            .field("rate_limit", &self.rate_limit)
            .field("rate_interval_secs", &self.rate_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl HttpSourceConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_secs(self.rate_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// [`PageSource`] backed by the upstream REST API.
pub struct HttpPageSource {
    config: HttpSourceConfig,
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SourceError::Config("base_url is required".into()));
        }
        if config.api_key.is_empty() {
            return Err(SourceError::Config("api_key is required".into()));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn get_page(
        &self,
        resource: &str,
        query: &Query,
        page: u64,
        per_page: u64,
        deadline: Deadline,
    ) -> SourceResult<String> {
        let mut request = self
            .client
            .get(self.url(resource))
            .basic_auth(&self.config.api_key, Some(""))
            .header(ACCEPT, "application/json")
            .query(&[("page", page), ("per_page", per_page)])
            .query(query.pairs());

        if let Some(remaining) = deadline.remaining() {
            if remaining.is_zero() {
                return Err(SourceError::DeadlineExceeded);
            }
            request = request.timeout(remaining.min(self.config.request_timeout()));
        }

        debug!("GET {} page {}", resource, page);

        deadline
            .run(async {
                let response = request.send().await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(self.config.rate_interval_secs);
                    return Err(SourceError::RateLimited { retry_after_secs });
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }

                Ok(response.text().await?)
            })
            .await?
    }
}
