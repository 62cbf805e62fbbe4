//! Pattern compiler
//!
//! Classifies the pattern part of a rule (options already stripped) and
//! builds the matching [`Pattern`] variant. Priority order: `||` domain
//! anchor, leading `|`, trailing `|`, `^` separator, plain substring.

use ns_core::Pattern;
use regex::RegexBuilder;

use crate::parser::Rejection;

/// Regex class standing in for an ABP `^` separator.
pub const SEPARATOR_CLASS: &str = "[^a-zA-Z0-9._%-]";

/// Upper bound on compiled regex size, guards against pathological rules.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

pub fn compile_pattern(text: &str) -> Result<Pattern, Rejection> {
    if text.is_empty() {
        return Err(Rejection::EmptyPattern);
    }

    if let Some(pos) = text.find("||") {
        let rest = &text[pos + 2..];
        let end = rest.find('^').unwrap_or(rest.len());
        return compile_domain_anchor(&rest[..end]);
    }

    if let Some(rest) = text.strip_prefix('|') {
        return Ok(Pattern::prefix(rest)?);
    }

    if let Some(rest) = text.strip_suffix('|') {
        return Ok(Pattern::suffix(rest)?);
    }

    if text.contains('^') {
        return compile_separator(text);
    }

    // Outer wildcards are no-ops for infix matching
    Ok(Pattern::substring(text.trim_matches('*'))?)
}

fn compile_domain_anchor(target: &str) -> Result<Pattern, Rejection> {
    let target = target.trim_end_matches('|');

    let (host, path) = match target.find('/') {
        Some(pos) => (&target[..pos], Some(target[pos..].trim_end_matches('*'))),
        None => (target, None),
    };
    if path.is_some_and(|path| path.contains('*')) {
        return Err(Rejection::WildcardPath);
    }

    Ok(Pattern::domain(host, path)?)
}

/// Translate a separator pattern into regex source: literal text is escaped,
/// `*` becomes `.*` and `^` becomes [`SEPARATOR_CLASS`].
pub fn separator_regex_source(text: &str) -> String {
    let mut source = String::with_capacity(text.len() * 2);
    let mut literal = String::new();

    for ch in text.chars() {
        match ch {
            '^' | '*' => {
                if !literal.is_empty() {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                }
                source.push_str(if ch == '^' { SEPARATOR_CLASS } else { ".*" });
            }
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        source.push_str(&regex::escape(&literal));
    }

    source
}

fn compile_separator(text: &str) -> Result<Pattern, Rejection> {
    let source = separator_regex_source(text);
    let regex = RegexBuilder::new(&source)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|_| Rejection::InvalidRegex)?;
    Ok(Pattern::separator(regex)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::RuleKind;

    #[test]
    fn classifies_domain_anchor() {
        let pattern = compile_pattern("||doubleclick.net^").unwrap();
        assert_eq!(pattern.kind(), RuleKind::DomainAnchor);
        assert_eq!(pattern.as_str(), "doubleclick.net");

        let pattern = compile_pattern("||Ads.Example.com").unwrap();
        assert_eq!(pattern.as_str(), "ads.example.com");

        match compile_pattern("||tracker.com/allowed^").unwrap() {
            Pattern::Domain(domain) => {
                assert_eq!(domain.domain(), "tracker.com");
                assert_eq!(domain.path(), Some("/allowed"));
            }
            other => panic!("unexpected pattern {other:?}"),
        }
    }

    #[test]
    fn rejects_interior_path_wildcards() {
        assert_eq!(compile_pattern("||ads.com/banner*.gif").unwrap_err(), Rejection::WildcardPath);
        assert_eq!(compile_pattern("||ads.com/*/pixel^").unwrap_err(), Rejection::WildcardPath);

        match compile_pattern("||ads.com/banner*").unwrap() {
            Pattern::Domain(domain) => assert_eq!(domain.path(), Some("/banner")),
            other => panic!("unexpected pattern {other:?}"),
        }
    }

    #[test]
    fn domain_anchor_takes_priority() {
        // Contains `||` even though it also starts with `|` and contains `^`
        let pattern = compile_pattern("||ads.com^|").unwrap();
        assert_eq!(pattern.kind(), RuleKind::DomainAnchor);
    }

    #[test]
    fn rejects_bad_domains() {
        assert_eq!(compile_pattern("||^").unwrap_err(), Rejection::EmptyPattern);
        assert_eq!(compile_pattern("||ads*.com^").unwrap_err(), Rejection::InvalidDomain);
        assert_eq!(compile_pattern("||ads.com:8080^").unwrap_err(), Rejection::InvalidDomain);
    }

    #[test]
    fn classifies_anchors() {
        let pattern = compile_pattern("|https://ads.").unwrap();
        assert_eq!(pattern, Pattern::prefix("https://ads.").unwrap());

        let pattern = compile_pattern(".swf|").unwrap();
        assert_eq!(pattern, Pattern::suffix(".swf").unwrap());

        // Prefix wins over separator
        let pattern = compile_pattern("|http://x.com^").unwrap();
        assert_eq!(pattern.kind(), RuleKind::PrefixAnchor);
        assert_eq!(pattern.as_str(), "http://x.com^");
    }

    #[test]
    fn compiles_separator_patterns() {
        assert_eq!(separator_regex_source("/ads^"), "/ads[^a-zA-Z0-9._%-]");
        assert_eq!(separator_regex_source("a.b*^"), r"a\.b.*[^a-zA-Z0-9._%-]");

        let pattern = compile_pattern("/banner^").unwrap();
        assert_eq!(pattern.kind(), RuleKind::SeparatorPattern);
        let Pattern::Separator(regex) = pattern else {
            panic!("expected separator");
        };
        assert!(regex.is_match("https://x.com/BANNER/1.png"));
        assert!(regex.is_match("https://x.com/banner?x"));
        assert!(!regex.is_match("https://x.com/banner.png"));
        assert!(!regex.is_match("https://x.com/banner-1"));
    }

    #[test]
    fn classifies_substrings() {
        assert_eq!(compile_pattern("/adframe.").unwrap(), Pattern::substring("/adframe.").unwrap());
        assert_eq!(compile_pattern("*/ads/*").unwrap(), Pattern::substring("/ads/").unwrap());
        assert_eq!(compile_pattern("***").unwrap_err(), Rejection::EmptyPattern);
    }
}
