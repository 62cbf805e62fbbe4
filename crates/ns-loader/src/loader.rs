//! Concurrent list loading
//!
//! `load` spawns one task per source, each fetching (or reusing the cache)
//! and parsing independently under its own timeout. Results are joined and
//! applied in source order, so the resulting rule order only depends on the
//! source order.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use ns_compiler::{parse_filter_list, ListParse, ParseSummary};
use ns_core::RuleSet;
use tokio::task::JoinSet;

use crate::fetch::{FetchError, Fetcher};
use crate::source::FilterSource;

/// Whether cached text may stand in for a network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Use the cached text of a source when it has one
    PreferCache,
    /// Fetch every source again
    Refresh,
}

/// Per-source result of one load cycle.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub list_id: u16,
    pub name: String,
    pub url: String,
    pub from_cache: bool,
    pub result: Result<ParseSummary, String>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub rule_set: Arc<RuleSet>,
    pub outcomes: Vec<SourceOutcome>,
}

impl LoadReport {
    /// No source configured, or none produced any text.
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.iter().any(SourceOutcome::is_ok)
    }

    pub fn loaded_sources(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    pub fn failed_sources(&self) -> usize {
        self.outcomes.len() - self.loaded_sources()
    }
}

struct SourceText {
    text: Arc<str>,
    from_cache: bool,
}

type TaskOutput = (usize, Result<(SourceText, ListParse), FetchError>);

pub struct ListLoader<F> {
    fetcher: Arc<F>,
    timeout: Duration,
}

impl<F> ListLoader<F>
where
    F: Fetcher + Send + Sync + 'static,
{
    pub fn new(fetcher: F, timeout: Duration) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            timeout,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load every source and build a new rule set. Never fails: a source
    /// that cannot be fetched contributes no rules and keeps its cache.
    pub async fn load(&self, sources: &mut [FilterSource], mode: LoadMode) -> LoadReport {
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

        for (index, source) in sources.iter().enumerate() {
            let cached = match mode {
                LoadMode::PreferCache => source.cached_raw_text().cloned(),
                LoadMode::Refresh => None,
            };
            let fetcher = Arc::clone(&self.fetcher);
            let url = source.url().to_string();
            let list_id = source.list_id();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let text = match cached {
                    Some(text) => Ok(SourceText {
                        text,
                        from_cache: true,
                    }),
                    None => fetch_with_timeout(fetcher.as_ref(), &url, timeout)
                        .await
                        .map(|text| SourceText {
                            text: Arc::from(text),
                            from_cache: false,
                        }),
                };

                let result = text.map(|text| {
                    let parsed = parse_filter_list(&text.text, list_id);
                    (text, parsed)
                });
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<(SourceText, ListParse), FetchError>>> =
            (0..sources.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => warn!("Filter source task failed: {}", err),
            }
        }

        let mut all_rules = Vec::new();
        let mut outcomes = Vec::with_capacity(sources.len());

        for (source, result) in sources.iter_mut().zip(results) {
            let result = result.unwrap_or(Err(FetchError::TaskFailed));
            match result {
                Ok((text, parsed)) => {
                    info!(
                        "Loaded '{}' (ID {}) from {}: {} rules{}",
                        source.name(),
                        source.list_id(),
                        source.url(),
                        parsed.summary.rules,
                        if text.from_cache { " (cached)" } else { "" }
                    );
                    if !text.from_cache {
                        source.record_success(text.text);
                    }
                    all_rules.extend(parsed.rules);
                    outcomes.push(SourceOutcome {
                        list_id: source.list_id(),
                        name: source.name().to_string(),
                        url: source.url().to_string(),
                        from_cache: text.from_cache,
                        result: Ok(parsed.summary),
                    });
                }
                Err(err) => {
                    warn!(
                        "Failed to load '{}' (ID {}) from {}: {}",
                        source.name(),
                        source.list_id(),
                        source.url(),
                        err
                    );
                    source.record_failure(&err.to_string());
                    outcomes.push(SourceOutcome {
                        list_id: source.list_id(),
                        name: source.name().to_string(),
                        url: source.url().to_string(),
                        from_cache: false,
                        result: Err(err.to_string()),
                    });
                }
            }
        }

        let report = LoadReport {
            rule_set: Arc::new(RuleSet::new(all_rules)),
            outcomes,
        };

        if sources.is_empty() {
            warn!("No filter sources configured");
        } else if report.is_total_failure() {
            warn!("All {} filter sources failed to load", sources.len());
        }

        report
    }
}

async fn fetch_with_timeout<F: Fetcher>(fetcher: &F, url: &str, timeout: Duration) -> Result<String, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
