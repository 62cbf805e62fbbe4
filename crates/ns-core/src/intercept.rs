//! Interception adapter
//!
//! Boundary between the host's request hook and the engine. The host supplies
//! the URL and whether the request is a top-level navigation; the adapter
//! answers with a cancel flag and records the decision exactly once.

use std::sync::Arc;

use crate::engine::FilterEngine;
use crate::types::{RequestKind, Verdict};

/// One outbound request as reported by the host.
#[derive(Debug, Clone, Copy)]
pub struct RequestEvent<'a> {
    pub url: &'a str,
    pub is_navigation: bool,
}

impl<'a> RequestEvent<'a> {
    pub fn subresource(url: &'a str) -> Self {
        Self {
            url,
            is_navigation: false,
        }
    }

    pub fn navigation(url: &'a str) -> Self {
        Self {
            url,
            is_navigation: true,
        }
    }

    pub fn kind(&self) -> RequestKind {
        RequestKind::from_navigation(self.is_navigation)
    }
}

/// Host-facing answer: cancel aborts the request, otherwise it proceeds
/// unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterceptResponse {
    pub cancel: bool,
}

#[derive(Debug, Clone)]
pub struct InterceptionAdapter {
    engine: Arc<FilterEngine>,
}

impl InterceptionAdapter {
    pub fn new(engine: Arc<FilterEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<FilterEngine> {
        &self.engine
    }

    /// Called for every outbound request. Only consults in-memory state.
    pub fn on_before_request(&self, event: &RequestEvent<'_>) -> InterceptResponse {
        let verdict = self.evaluate(event);
        InterceptResponse {
            cancel: verdict.blocked,
        }
    }

    /// Like [`on_before_request`](Self::on_before_request) but returns the
    /// full verdict, including the rule that matched.
    pub fn evaluate(&self, event: &RequestEvent<'_>) -> Verdict {
        let verdict = self.engine.decide(event.url, event.kind());
        self.engine.stats().record(verdict.blocked);
        verdict
    }
}
