//! Startup load and periodic refresh
//!
//! Both paths build a new rule set off the request path and hand it to the
//! engine in a single swap.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use ns_core::FilterEngine;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetch::Fetcher;
use crate::loader::{ListLoader, LoadMode, LoadReport};
use crate::source::FilterSource;

/// Initial load. Cached text is used where present. Never fails: with no
/// usable list the engine keeps an empty rule set and reports inactive.
pub async fn bootstrap<F>(engine: &FilterEngine, loader: &ListLoader<F>, sources: &mut [FilterSource]) -> LoadReport
where
    F: Fetcher + Send + Sync + 'static,
{
    let report = loader.load(sources, LoadMode::PreferCache).await;
    let total_failure = report.is_total_failure();

    engine.replace_rule_set(Arc::clone(&report.rule_set));
    engine.set_list_health(!total_failure);
    report
}

/// Re-fetch every source and swap in the result. When nothing could be
/// fetched the engine keeps its current rules.
pub async fn refresh_now<F>(engine: &FilterEngine, loader: &ListLoader<F>, sources: &mut [FilterSource]) -> LoadReport
where
    F: Fetcher + Send + Sync + 'static,
{
    let report = loader.load(sources, LoadMode::Refresh).await;

    if report.is_total_failure() {
        let current = engine.rule_set();
        warn!("Refresh produced no lists; keeping {} existing rules", current.len());
        engine.set_list_health(!current.is_empty());
    } else {
        engine.replace_rule_set(Arc::clone(&report.rule_set));
        engine.set_list_health(true);
    }
    report
}

/// Refresh on a fixed interval until the handle is aborted. The first
/// refresh happens one interval after the call.
pub fn spawn_refresh<F>(
    engine: Arc<FilterEngine>,
    loader: Arc<ListLoader<F>>,
    sources: Arc<Mutex<Vec<FilterSource>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    F: Fetcher + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Filter list refresh every {:?}", interval);
        loop {
            ticker.tick().await;
            debug!("Starting scheduled filter list refresh");

            let mut sources = sources.lock().await;
            let report = refresh_now(&engine, &loader, &mut sources).await;
            info!(
                "Scheduled refresh done: {} loaded, {} failed",
                report.loaded_sources(),
                report.failed_sources()
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::{FilterStatus, RequestKind};

    use crate::loader::tests::{sources, FakeFetcher};

    const A: &str = "https://lists.test/a.txt";
    const B: &str = "https://lists.test/b.txt";

    fn blocked(engine: &FilterEngine, url: &str) -> bool {
        engine.decide(url, RequestKind::Subresource).blocked
    }

    #[tokio::test]
    async fn bootstrap_activates_rules() {
        let fetcher = FakeFetcher::default()
            .with(A, Ok("||ads.com^"))
            .with(B, Err(500));
        let loader = ListLoader::new(fetcher, Duration::from_secs(5));
        let engine = FilterEngine::new(true);
        let mut sources = sources(&[A, B]);

        let report = bootstrap(&engine, &loader, &mut sources).await;

        assert_eq!(report.loaded_sources(), 1);
        assert_eq!(engine.status(), FilterStatus::Active);
        assert!(blocked(&engine, "https://ads.com/x.js"));
    }

    #[tokio::test]
    async fn bootstrap_total_failure_is_inactive() {
        let fetcher = FakeFetcher::default().with(A, Err(500));
        let loader = ListLoader::new(fetcher, Duration::from_secs(5));
        let engine = FilterEngine::new(true);
        let mut sources = sources(&[A]);

        let report = bootstrap(&engine, &loader, &mut sources).await;

        assert!(report.is_total_failure());
        assert_eq!(engine.status(), FilterStatus::Inactive);
        assert!(engine.rule_set().is_empty());
        assert!(!blocked(&engine, "https://ads.com/x.js"));
    }

    #[tokio::test]
    async fn bootstrap_uses_seeded_cache() {
        let loader = ListLoader::new(FakeFetcher::default(), Duration::from_secs(5));
        let engine = FilterEngine::new(true);
        let mut sources = vec![FilterSource::new(0, "ads", A, "generic").with_cached_text("||cached.com^")];

        bootstrap(&engine, &loader, &mut sources).await;

        assert!(blocked(&engine, "https://cached.com/"));
        assert_eq!(loader.fetcher().calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_rules() {
        let fetcher = FakeFetcher::default().with(A, Ok("||ads.com^"));
        let loader = ListLoader::new(fetcher, Duration::from_secs(5));
        let engine = FilterEngine::new(true);
        let mut sources = sources(&[A]);
        bootstrap(&engine, &loader, &mut sources).await;

        loader.fetcher().set(A, Err(503));
        let report = refresh_now(&engine, &loader, &mut sources).await;

        assert!(report.is_total_failure());
        assert_eq!(engine.status(), FilterStatus::Active);
        assert!(blocked(&engine, "https://ads.com/x.js"));
    }

    #[tokio::test]
    async fn refresh_swaps_in_new_rules() {
        let fetcher = FakeFetcher::default().with(A, Ok("||old.com^"));
        let loader = ListLoader::new(fetcher, Duration::from_secs(5));
        let engine = FilterEngine::new(true);
        let mut sources = sources(&[A]);
        bootstrap(&engine, &loader, &mut sources).await;

        let before = engine.rule_set();
        loader.fetcher().set(A, Ok("||new.com^"));
        refresh_now(&engine, &loader, &mut sources).await;

        assert!(!blocked(&engine, "https://old.com/"));
        assert!(blocked(&engine, "https://new.com/"));
        // A reader holding the old snapshot still sees it intact.
        assert_eq!(before.block_rules()[0].raw_text(), "||old.com^");
    }

    #[tokio::test]
    async fn periodic_refresh_picks_up_changes() {
        let fetcher = FakeFetcher::default().with(A, Ok("||old.com^"));
        let loader = Arc::new(ListLoader::new(fetcher, Duration::from_secs(5)));
        let engine = Arc::new(FilterEngine::new(true));
        let sources = Arc::new(Mutex::new(sources(&[A])));
        bootstrap(&engine, &*loader, &mut sources.lock().await).await;

        loader.fetcher().set(A, Ok("||new.com^"));
        let handle = spawn_refresh(
            Arc::clone(&engine),
            Arc::clone(&loader),
            Arc::clone(&sources),
            Duration::from_millis(20),
        );

        let swapped = tokio::time::timeout(Duration::from_secs(5), async {
            while !blocked(&engine, "https://new.com/") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        handle.abort();

        assert!(swapped.is_ok());
        assert!(!blocked(&engine, "https://old.com/"));
    }
}
