//! Core type definitions for NetSieve
//!
//! These types are shared by the compiler, the matcher and the host bindings.

use std::fmt;
use std::sync::Arc;

use crate::rule::Rule;

// =============================================================================
// Rule Kinds
// =============================================================================

/// Matching strategy of a compiled rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuleKind {
    /// `||domain^` - host equals the domain or is a subdomain of it
    DomainAnchor = 0,
    /// `|text` - URL starts with the text
    PrefixAnchor = 1,
    /// `text|` - URL ends with the text
    SuffixAnchor = 2,
    /// Pattern containing `^` separators, compiled to a regex
    SeparatorPattern = 3,
    /// Plain infix text
    Substring = 4,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DomainAnchor => "domain-anchor",
            Self::PrefixAnchor => "prefix-anchor",
            Self::SuffixAnchor => "suffix-anchor",
            Self::SeparatorPattern => "separator",
            Self::Substring => "substring",
        }
    }

    /// Whether matching needs the structured (host/path) view of the URL.
    pub fn needs_parsed_url(self) -> bool {
        !matches!(self, Self::Substring)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request Kinds
// =============================================================================

/// Whether a request is a user-initiated top-level navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Top-level page load, never blocked
    MainDocument,
    /// Scripts, images, XHR, frames and everything else
    Subresource,
}

impl RequestKind {
    /// Map a browser resource type string to a request kind.
    pub fn from_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "main_frame" | "mainFrame" | "document" | "navigation" => Self::MainDocument,
            _ => Self::Subresource,
        }
    }

    pub fn from_navigation(is_navigation: bool) -> Self {
        if is_navigation {
            Self::MainDocument
        } else {
            Self::Subresource
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Result of evaluating one request against a rule set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verdict {
    /// Whether the request should be cancelled
    pub blocked: bool,
    /// Block rule that decided the request (for logging)
    pub matched_rule: Option<Arc<Rule>>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn block(rule: Arc<Rule>) -> Self {
        Self {
            blocked: true,
            matched_rule: Some(rule),
        }
    }
}
