//! Filter sources
//!
//! A source remembers the raw text of its last successful fetch. A failed
//! fetch records the error but keeps the cached text for the next attempt.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Outcome of the most recent fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    NotFetched,
    Success,
    Failed(String),
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFetched => f.write_str("not fetched"),
            Self::Success => f.write_str("ok"),
            Self::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterSource {
    list_id: u16,
    name: String,
    url: String,
    category: String,
    last_fetch_time: Option<SystemTime>,
    last_fetch_status: FetchStatus,
    cached_raw_text: Option<Arc<str>>,
}

impl FilterSource {
    pub fn new(list_id: u16, name: &str, url: &str, category: &str) -> Self {
        Self {
            list_id,
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            last_fetch_time: None,
            last_fetch_status: FetchStatus::NotFetched,
            cached_raw_text: None,
        }
    }

    /// Seed the cache, e.g. from text persisted by the host.
    pub fn with_cached_text(mut self, text: &str) -> Self {
        self.cached_raw_text = Some(Arc::from(text));
        self
    }

    pub fn list_id(&self) -> u16 {
        self.list_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn last_fetch_time(&self) -> Option<SystemTime> {
        self.last_fetch_time
    }

    pub fn last_fetch_status(&self) -> &FetchStatus {
        &self.last_fetch_status
    }

    pub fn cached_raw_text(&self) -> Option<&Arc<str>> {
        self.cached_raw_text.as_ref()
    }

    pub(crate) fn record_success(&mut self, text: Arc<str>) {
        self.last_fetch_time = Some(SystemTime::now());
        self.last_fetch_status = FetchStatus::Success;
        self.cached_raw_text = Some(text);
    }

    pub(crate) fn record_failure(&mut self, error: &str) {
        self.last_fetch_time = Some(SystemTime::now());
        self.last_fetch_status = FetchStatus::Failed(error.to_string());
    }
}
