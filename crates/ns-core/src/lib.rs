//! NetSieve Core Library
//!
//! This crate provides the rule model and the request matching engine for the
//! NetSieve content filter.
//!
//! # Architecture
//!
//! Filter lists are compiled (by `ns-compiler`) into [`Rule`] values, which are
//! collected into an immutable [`RuleSet`]. The [`FilterEngine`] holds the
//! current set behind an atomic pointer so a refreshed set can be swapped in
//! while requests are being matched. The hot path does not lock and only
//! allocates when a request host needs case folding.
//!
//! # Modules
//!
//! - `types`: Request kinds, rule kinds and verdicts
//! - `rule`: Compiled rule and pattern variants
//! - `ruleset`: Immutable block/exception partitions with a host index
//! - `url`: Fast URL parsing without allocations
//! - `matcher`: Core request decision function
//! - `stats`: Lock-free block/allow counters
//! - `engine`: Per-profile engine context (rule set, toggle, stats)
//! - `intercept`: Adapter between host request events and the engine

pub mod types;
pub mod rule;
pub mod ruleset;
pub mod url;
pub mod matcher;
pub mod stats;
pub mod engine;
pub mod intercept;

// Re-export commonly used types
pub use engine::{FilterEngine, FilterStatus};
pub use intercept::{InterceptResponse, InterceptionAdapter, RequestEvent};
pub use matcher::decide;
pub use rule::{DomainPattern, Pattern, Rule, RuleError};
pub use ruleset::RuleSet;
pub use stats::{Stats, StatsTracker};
pub use types::{RequestKind, RuleKind, Verdict};
