//! Compiled filter rules
//!
//! A [`Rule`] is one directive from a filter list after parsing. Its
//! [`Pattern`] is a closed set of variants, one per [`RuleKind`], and every
//! variant is validated when it is constructed so an empty pattern never
//! reaches a rule set.

use regex::Regex;

use crate::types::RuleKind;
use crate::url::{host_matches_domain, RequestUrl};

/// Error type for rule construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Pattern is empty")]
    EmptyPattern,
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("Invalid path prefix: {0}")]
    InvalidPath(String),
}

// =============================================================================
// Domain Pattern
// =============================================================================

/// Host (and optional path prefix) targeted by a `||` rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainPattern {
    domain: String,
    path: Option<String>,
}

impl DomainPattern {
    /// Create a domain pattern. The domain is lower-cased and must only
    /// contain hostname characters.
    pub fn new(domain: &str, path: Option<&str>) -> Result<Self, RuleError> {
        let domain = domain.trim().trim_matches('.');
        if domain.is_empty() {
            return Err(RuleError::EmptyPattern);
        }

        if !domain
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
        {
            return Err(RuleError::InvalidDomain(domain.to_string()));
        }

        let path = match path {
            Some(path) if path.is_empty() => None,
            Some(path) if !path.starts_with('/') => {
                return Err(RuleError::InvalidPath(path.to_string()));
            }
            Some(path) => Some(path.to_string()),
            None => None,
        };

        Ok(Self {
            domain: domain.to_ascii_lowercase(),
            path,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Check the pattern against a parsed request URL.
    #[inline]
    pub fn matches(&self, url: &RequestUrl<'_>) -> bool {
        if !host_matches_domain(&url.host, &self.domain) {
            return false;
        }
        match &self.path {
            Some(path) => url.rest.starts_with(path.as_str()),
            None => true,
        }
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// Matchable representation of a rule, one variant per rule kind.
#[derive(Debug, Clone)]
pub enum Pattern {
    Domain(DomainPattern),
    Prefix(String),
    Suffix(String),
    Separator(Regex),
    Substring(String),
}

impl Pattern {
    pub fn domain(domain: &str, path: Option<&str>) -> Result<Self, RuleError> {
        DomainPattern::new(domain, path).map(Self::Domain)
    }

    pub fn prefix(text: &str) -> Result<Self, RuleError> {
        non_empty(text).map(Self::Prefix)
    }

    pub fn suffix(text: &str) -> Result<Self, RuleError> {
        non_empty(text).map(Self::Suffix)
    }

    pub fn substring(text: &str) -> Result<Self, RuleError> {
        non_empty(text).map(Self::Substring)
    }

    pub fn separator(regex: Regex) -> Result<Self, RuleError> {
        if regex.as_str().is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        Ok(Self::Separator(regex))
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Domain(_) => RuleKind::DomainAnchor,
            Self::Prefix(_) => RuleKind::PrefixAnchor,
            Self::Suffix(_) => RuleKind::SuffixAnchor,
            Self::Separator(_) => RuleKind::SeparatorPattern,
            Self::Substring(_) => RuleKind::Substring,
        }
    }

    /// Textual form of the pattern (regex source for separator patterns).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Domain(d) => d.domain(),
            Self::Prefix(text) | Self::Suffix(text) | Self::Substring(text) => text.as_str(),
            Self::Separator(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Domain(a), Self::Domain(b)) => a == b,
            (Self::Prefix(a), Self::Prefix(b)) => a == b,
            (Self::Suffix(a), Self::Suffix(b)) => a == b,
            (Self::Substring(a), Self::Substring(b)) => a == b,
            (Self::Separator(a), Self::Separator(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Pattern {}

fn non_empty(text: &str) -> Result<String, RuleError> {
    if text.is_empty() {
        Err(RuleError::EmptyPattern)
    } else {
        Ok(text.to_string())
    }
}

// =============================================================================
// Rule
// =============================================================================

/// One compiled filter directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pattern: Pattern,
    raw_text: String,
    is_exception: bool,
    list_id: u16,
}

impl Rule {
    pub fn new(pattern: Pattern, raw_text: &str, is_exception: bool) -> Result<Self, RuleError> {
        if pattern.as_str().is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        Ok(Self {
            pattern,
            raw_text: raw_text.to_string(),
            is_exception,
            list_id: 0,
        })
    }

    /// Tag the rule with the filter source it was loaded from.
    pub fn with_list_id(mut self, list_id: u16) -> Self {
        self.list_id = list_id;
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.pattern.kind()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Original filter line, kept for diagnostics.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_exception(&self) -> bool {
        self.is_exception
    }

    pub fn list_id(&self) -> u16 {
        self.list_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_patterns() {
        assert_eq!(Pattern::prefix("").unwrap_err(), RuleError::EmptyPattern);
        assert_eq!(Pattern::suffix("").unwrap_err(), RuleError::EmptyPattern);
        assert_eq!(Pattern::substring("").unwrap_err(), RuleError::EmptyPattern);
        assert_eq!(Pattern::domain("", None).unwrap_err(), RuleError::EmptyPattern);
        assert_eq!(Pattern::domain("...", None).unwrap_err(), RuleError::EmptyPattern);
    }

    #[test]
    fn normalizes_domains() {
        let pattern = DomainPattern::new("Ads.Example.COM.", None).expect("valid domain");
        assert_eq!(pattern.domain(), "ads.example.com");
        assert_eq!(pattern.path(), None);

        let with_path = DomainPattern::new("tracker.com", Some("/allowed")).expect("valid domain");
        assert_eq!(with_path.path(), Some("/allowed"));
    }

    #[test]
    fn rejects_wildcard_domains() {
        assert!(matches!(
            DomainPattern::new("ads*.example.com", None),
            Err(RuleError::InvalidDomain(_))
        ));
        assert!(matches!(
            DomainPattern::new("example.com", Some("ads")),
            Err(RuleError::InvalidPath(_))
        ));
    }

    #[test]
    fn compares_separator_patterns_by_source() {
        let a = Pattern::separator(Regex::new("ads[^a-z]").unwrap()).unwrap();
        let b = Pattern::separator(Regex::new("ads[^a-z]").unwrap()).unwrap();
        let c = Pattern::separator(Regex::new("ads").unwrap()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.kind(), RuleKind::SeparatorPattern);
    }

    #[test]
    fn builds_rules() {
        let rule = Rule::new(Pattern::substring("/banner/").unwrap(), "/banner/", false)
            .unwrap()
            .with_list_id(3);
        assert_eq!(rule.kind(), RuleKind::Substring);
        assert_eq!(rule.raw_text(), "/banner/");
        assert!(!rule.is_exception());
        assert_eq!(rule.list_id(), 3);
    }
}
