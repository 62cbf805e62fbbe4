//! Filter engine context
//!
//! One [`FilterEngine`] per browsing profile. It owns the current rule set,
//! the enable toggle, list health and statistics. The rule set sits behind an
//! [`ArcSwap`] so a refresh replaces it atomically while readers keep using
//! whichever snapshot they loaded.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{info, warn};
use serde::Serialize;

use crate::matcher::decide;
use crate::ruleset::RuleSet;
use crate::stats::{Stats, StatsTracker};
use crate::types::{RequestKind, Verdict};

/// Passive status shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStatus {
    /// Enabled with at least one list loaded
    Active,
    /// Turned off by the user
    Disabled,
    /// Enabled but no list could be loaded
    Inactive,
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Inactive => "inactive",
        })
    }
}

#[derive(Debug)]
pub struct FilterEngine {
    rule_set: ArcSwap<RuleSet>,
    enabled: AtomicBool,
    lists_loaded: AtomicBool,
    stats: StatsTracker,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FilterEngine {
    /// Create an engine with an empty rule set and the restored toggle state.
    pub fn new(enabled: bool) -> Self {
        Self {
            rule_set: ArcSwap::from_pointee(RuleSet::empty()),
            enabled: AtomicBool::new(enabled),
            lists_loaded: AtomicBool::new(false),
            stats: StatsTracker::new(),
        }
    }

    pub fn with_rule_set(rule_set: RuleSet) -> Self {
        let engine = Self::new(true);
        engine.replace_rule_set(rule_set);
        engine
    }

    /// Atomically replace the active rule set.
    pub fn replace_rule_set(&self, rule_set: impl Into<Arc<RuleSet>>) {
        let rule_set = rule_set.into();
        info!(
            "Activating rule set: {} block rules, {} exception rules",
            rule_set.block_rules().len(),
            rule_set.exception_rules().len()
        );
        self.lists_loaded.store(!rule_set.is_empty(), Ordering::Release);
        self.rule_set.store(rule_set);
    }

    /// Current rule set. Callers keep the snapshot they loaded even if a
    /// refresh swaps in a new one.
    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.rule_set.load_full()
    }

    /// Record whether the last load produced any list. A failed refresh that
    /// keeps the previous rules should pass `true`.
    pub fn set_list_health(&self, loaded: bool) {
        if !loaded {
            warn!("No filter list is loaded; blocking is inactive");
        }
        self.lists_loaded.store(loaded, Ordering::Release);
    }

    pub fn set_enabled(&self, enabled: bool) {
        info!("Filtering {}", if enabled { "enabled" } else { "disabled" });
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn status(&self) -> FilterStatus {
        if !self.is_enabled() {
            FilterStatus::Disabled
        } else if self.lists_loaded.load(Ordering::Acquire) {
            FilterStatus::Active
        } else {
            FilterStatus::Inactive
        }
    }

    /// Decide a request against the current rule set. Returns allow for
    /// everything while the engine is disabled. Does not record statistics.
    pub fn decide(&self, url: &str, kind: RequestKind) -> Verdict {
        if !self.is_enabled() {
            return Verdict::allow();
        }
        let rule_set = self.rule_set.load();
        decide(&rule_set, url, kind)
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn get_stats(&self) -> Stats {
        self.stats.snapshot()
    }
}
