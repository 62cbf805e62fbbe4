//! Block/allow statistics
//!
//! Counters are updated on every request, so they are plain atomics rather
//! than a lock. Session counters reset each run; totals are lifetime counts
//! restored from external storage at startup.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "blocked")]
    pub session_blocked: u64,
    #[serde(rename = "allowed")]
    pub session_allowed: u64,
    #[serde(rename = "totalBlocked")]
    pub total_blocked: u64,
    #[serde(rename = "totalAllowed")]
    pub total_allowed: u64,
}

#[derive(Debug, Default)]
pub struct StatsTracker {
    session_blocked: AtomicU64,
    session_allowed: AtomicU64,
    total_blocked: AtomicU64,
    total_allowed: AtomicU64,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decision.
    #[inline]
    pub fn record(&self, blocked: bool) {
        if blocked {
            self.session_blocked.fetch_add(1, Ordering::Relaxed);
            self.total_blocked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.session_allowed.fetch_add(1, Ordering::Relaxed);
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            session_blocked: self.session_blocked.load(Ordering::Relaxed),
            session_allowed: self.session_allowed.load(Ordering::Relaxed),
            total_blocked: self.total_blocked.load(Ordering::Relaxed),
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
        }
    }

    /// Zero the session counters. Totals are untouched.
    pub fn reset_session(&self) {
        self.session_blocked.store(0, Ordering::Relaxed);
        self.session_allowed.store(0, Ordering::Relaxed);
    }

    /// Add lifetime counters persisted by a previous run.
    pub fn restore_totals(&self, total_blocked: u64, total_allowed: u64) {
        self.total_blocked.fetch_add(total_blocked, Ordering::Relaxed);
        self.total_allowed.fetch_add(total_allowed, Ordering::Relaxed);
    }
}
