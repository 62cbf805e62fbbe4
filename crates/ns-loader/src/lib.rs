//! NetSieve List Loader
//!
//! Fetches filter lists from their configured sources, caches the raw text per
//! source and compiles everything into a [`ns_core::RuleSet`]. Each source is
//! fetched in its own task with its own timeout, so one slow or broken source
//! never delays or fails the others.

pub mod config;
pub mod fetch;
pub mod loader;
pub mod refresh;
pub mod source;

pub use config::{ConfigError, ListConfig, LoaderConfig};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use loader::{ListLoader, LoadMode, LoadReport, SourceOutcome};
pub use refresh::{bootstrap, refresh_now, spawn_refresh};
pub use source::{FetchStatus, FilterSource};
