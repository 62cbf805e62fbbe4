//! Core Decision Engine
//!
//! This is the hot path - every subresource request goes through here.
//! Exceptions are evaluated first and win absolutely; block rules are then
//! evaluated and the earliest-loaded match is reported.

use std::sync::Arc;

use crate::rule::{Pattern, Rule};
use crate::ruleset::{RulePartition, RuleSet};
use crate::types::{RequestKind, Verdict};
use crate::url::{host_suffixes, parse_request_url, RequestUrl};

/// URL being matched, with its structured view when it could be parsed.
struct MatchTarget<'a> {
    url: &'a str,
    parsed: Option<RequestUrl<'a>>,
}

/// Decide whether a request should be blocked.
///
/// Main document requests are never blocked. When the URL cannot be parsed
/// only substring rules are consulted.
pub fn decide(rule_set: &RuleSet, url: &str, kind: RequestKind) -> Verdict {
    if kind == RequestKind::MainDocument {
        return Verdict::allow();
    }

    let target = MatchTarget {
        url,
        parsed: parse_request_url(url),
    };

    if first_match(rule_set.exceptions(), &target).is_some() {
        return Verdict::allow();
    }

    match first_match(rule_set.blocks(), &target) {
        Some(rule) => Verdict::block(Arc::clone(rule)),
        None => Verdict::allow(),
    }
}

/// Check a single rule against a URL.
pub fn rule_matches_url(rule: &Rule, url: &str) -> bool {
    let target = MatchTarget {
        url,
        parsed: parse_request_url(url),
    };
    rule_matches(rule, &target)
}

#[inline]
fn rule_matches(rule: &Rule, target: &MatchTarget<'_>) -> bool {
    // Unparseable URLs only see raw-string rules
    if target.parsed.is_none() && rule.kind().needs_parsed_url() {
        return false;
    }

    match rule.pattern() {
        Pattern::Substring(text) => target.url.contains(text.as_str()),
        Pattern::Domain(domain) => target.parsed.as_ref().is_some_and(|url| domain.matches(url)),
        Pattern::Prefix(text) => target.url.starts_with(text.as_str()),
        Pattern::Suffix(text) => target.url.ends_with(text.as_str()),
        Pattern::Separator(regex) => regex.is_match(target.url),
    }
}

/// Find the earliest rule in `partition` that matches `target`.
///
/// Domain rules are looked up through the host index; the remaining rules are
/// scanned in order, stopping once no earlier position can win.
fn first_match<'r>(partition: &'r RulePartition, target: &MatchTarget<'_>) -> Option<&'r Arc<Rule>> {
    let rules = partition.rules();
    let mut best: Option<usize> = None;

    let scan = match &target.parsed {
        Some(parsed) => {
            for suffix in host_suffixes(&parsed.host) {
                let Some(positions) = partition.domain_positions(suffix) else {
                    continue;
                };
                for &pos in positions {
                    if best.is_some_and(|b| pos >= b) {
                        break;
                    }
                    if rule_matches(&rules[pos], target) {
                        best = Some(pos);
                        break;
                    }
                }
            }
            partition.scan_positions()
        }
        None => partition.substring_positions(),
    };

    for &pos in scan {
        if best.is_some_and(|b| pos >= b) {
            break;
        }
        if rule_matches(&rules[pos], target) {
            best = Some(pos);
            break;
        }
    }

    best.map(|pos| &rules[pos])
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn block(pattern: Pattern, raw: &str) -> Rule {
        Rule::new(pattern, raw, false).unwrap()
    }

    fn allow(pattern: Pattern, raw: &str) -> Rule {
        Rule::new(pattern, raw, true).unwrap()
    }

    fn separator(source: &str) -> Pattern {
        let regex = RegexBuilder::new(source).case_insensitive(true).build().unwrap();
        Pattern::separator(regex).unwrap()
    }

    #[test]
    fn blocks_domain_and_subdomains() {
        let set = RuleSet::new(vec![block(
            Pattern::domain("doubleclick.net", None).unwrap(),
            "||doubleclick.net^",
        )]);

        assert!(decide(&set, "https://doubleclick.net/x", RequestKind::Subresource).blocked);
        assert!(decide(&set, "https://ad.doubleclick.net/x", RequestKind::Subresource).blocked);
        assert!(decide(&set, "https://AD.DoubleClick.NET/x", RequestKind::Subresource).blocked);
        assert!(!decide(&set, "https://doubleclick.net.safe.com/x", RequestKind::Subresource).blocked);
        assert!(!decide(&set, "https://notdoubleclick.net/x", RequestKind::Subresource).blocked);
    }

    #[test]
    fn domain_must_be_suffix_of_host() {
        let set = RuleSet::new(vec![block(
            Pattern::domain("ads.example.com", None).unwrap(),
            "||ads.example.com^",
        )]);

        let url = "https://notads.example.com.evil.com/banner";
        assert!(!decide(&set, url, RequestKind::Subresource).blocked);
        assert!(decide(&set, "https://x.ads.example.com/", RequestKind::Subresource).blocked);
    }

    #[test]
    fn never_blocks_main_document() {
        let set = RuleSet::new(vec![
            block(Pattern::domain("example.com", None).unwrap(), "||example.com^"),
            block(Pattern::substring("example").unwrap(), "example"),
        ]);

        let verdict = decide(&set, "https://example.com/", RequestKind::MainDocument);
        assert!(!verdict.blocked);
        assert!(verdict.matched_rule.is_none());
    }

    #[test]
    fn exception_wins() {
        let set = RuleSet::new(vec![
            block(Pattern::domain("tracker.com", None).unwrap(), "||tracker.com^"),
            block(Pattern::substring("/allowed").unwrap(), "/allowed"),
            allow(
                Pattern::domain("tracker.com", Some("/allowed")).unwrap(),
                "@@||tracker.com/allowed^",
            ),
        ]);

        assert!(!decide(&set, "https://tracker.com/allowed/pixel.gif", RequestKind::Subresource).blocked);
        assert!(decide(&set, "https://tracker.com/other/pixel.gif", RequestKind::Subresource).blocked);
    }

    #[test]
    fn matches_each_kind() {
        let set = RuleSet::new(vec![
            block(Pattern::prefix("https://cdn.ads.io/").unwrap(), "|https://cdn.ads.io/"),
            block(Pattern::suffix(".swf").unwrap(), ".swf|"),
            block(separator(r"/banner[^a-zA-Z0-9._%-]"), "/banner^"),
            block(Pattern::substring("/adframe.").unwrap(), "/adframe."),
        ]);

        let cases = [
            ("https://cdn.ads.io/lib.js", true),
            ("https://example.com/cdn.ads.io/lib.js", false),
            ("https://example.com/movie.swf", true),
            ("https://example.com/movie.swf?x=1", false),
            ("https://example.com/BANNER/1.png", true),
            ("https://example.com/banner.png", false),
            ("https://example.com/adframe.html", true),
            ("https://example.com/AdFrame.html", false),
        ];

        for (url, expected) in cases {
            assert_eq!(decide(&set, url, RequestKind::Subresource).blocked, expected, "{url}");
        }
    }

    #[test]
    fn reports_first_loaded_rule() {
        let set = RuleSet::new(vec![
            block(Pattern::substring("/ads/").unwrap(), "/ads/"),
            block(Pattern::domain("example.com", None).unwrap(), "||example.com^"),
            block(Pattern::substring("banner").unwrap(), "banner"),
        ]);

        let verdict = decide(&set, "https://example.com/ads/banner.png", RequestKind::Subresource);
        assert_eq!(verdict.matched_rule.unwrap().raw_text(), "/ads/");

        let verdict = decide(&set, "https://example.com/img/banner.png", RequestKind::Subresource);
        assert_eq!(verdict.matched_rule.unwrap().raw_text(), "||example.com^");
    }

    #[test]
    fn reports_earliest_of_several_domain_rules() {
        let set = RuleSet::new(vec![
            block(Pattern::domain("example.com", None).unwrap(), "||example.com^"),
            block(Pattern::domain("ads.example.com", None).unwrap(), "||ads.example.com^"),
        ]);

        let verdict = decide(&set, "https://ads.example.com/x", RequestKind::Subresource);
        assert_eq!(verdict.matched_rule.unwrap().raw_text(), "||example.com^");
    }

    #[test]
    fn unparseable_url_uses_substring_rules_only() {
        let set = RuleSet::new(vec![
            block(Pattern::prefix("garbage").unwrap(), "|garbage"),
            block(Pattern::suffix("text").unwrap(), "text|"),
            block(separator("garbage[^a-zA-Z0-9._%-]"), "garbage^"),
        ]);
        assert!(!decide(&set, "garbage ad text", RequestKind::Subresource).blocked);

        let set = RuleSet::new(vec![block(Pattern::substring("ad text").unwrap(), "ad text")]);
        assert!(decide(&set, "garbage ad text", RequestKind::Subresource).blocked);

        let set = RuleSet::new(vec![
            block(Pattern::substring("ad text").unwrap(), "ad text"),
            allow(Pattern::substring("garbage").unwrap(), "@@garbage"),
        ]);
        assert!(!decide(&set, "garbage ad text", RequestKind::Subresource).blocked);
    }

    #[test]
    fn unparseable_fallback_follows_rule_kind() {
        let url = "garbage ad text";
        let rules = [
            block(Pattern::domain("garbage", None).unwrap(), "||garbage^"),
            block(Pattern::prefix("garbage").unwrap(), "|garbage"),
            block(Pattern::suffix("text").unwrap(), "text|"),
            block(separator("ad"), "ad^"),
            block(Pattern::substring("ad").unwrap(), "ad"),
        ];
        for rule in &rules {
            assert_eq!(rule_matches_url(rule, url), !rule.kind().needs_parsed_url(), "{}", rule.raw_text());
        }
    }

    #[test]
    fn empty_set_allows() {
        let verdict = decide(&RuleSet::empty(), "https://ads.com/", RequestKind::Subresource);
        assert_eq!(verdict, Verdict::allow());
    }

    #[test]
    fn single_rule_check() {
        let rule = block(Pattern::domain("ads.com", None).unwrap(), "||ads.com^");
        assert!(rule_matches_url(&rule, "http://www.ads.com/"));
        assert!(!rule_matches_url(&rule, "ads.com"));
    }
}
