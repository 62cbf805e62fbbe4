//! NetSieve Filter List Compiler
//!
//! This crate turns AdBlock-style filter list text into [`ns_core::Rule`]
//! values and immutable [`ns_core::RuleSet`]s.

pub mod parser;
pub mod pattern;

pub use parser::{
    classify_line, compile_lists, parse_filter_list, parse_line, ListParse, ParseSummary, Rejection,
};
pub use pattern::{compile_pattern, separator_regex_source};
