use chrono::{DateTime, SecondsFormat, Utc};

/// Key for upstream search filters.
pub const FILTER_KEY: &str = "q[]";

/// Ordered query-string filters forwarded unchanged to the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary key/value pair.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Matches any value of `field`, including unset. Listing endpoints hide
    /// archived or cancelled records unless asked for them this way.
    #[must_use]
    pub fn wildcard(self, field: &str) -> Self {
        self.param(FILTER_KEY, format!("{field}:*"))
    }

    /// Restricts results to records updated at or after `since`.
    #[must_use]
    pub fn updated_since(self, since: DateTime<Utc>) -> Self {
        self.param(
            FILTER_KEY,
            format!("updated_at:>={}", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )
    }

    /// Appends every pair of `other`.
    #[must_use]
    pub fn extend(mut self, other: &Query) -> Self {
        self.params.extend(other.params.iter().cloned());
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
