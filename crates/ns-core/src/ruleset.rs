//! Immutable rule set
//!
//! A [`RuleSet`] is built once per list refresh and never mutated. Block and
//! exception rules live in separate partitions, each keeping load order and a
//! host index over its domain-anchored rules.

use std::collections::HashMap;
use std::sync::Arc;

use crate::rule::{Pattern, Rule};
use crate::types::RuleKind;

// =============================================================================
// Rule Partition
// =============================================================================

/// Ordered rules of one polarity plus lookup tables for the matcher.
#[derive(Debug, Default)]
pub(crate) struct RulePartition {
    rules: Vec<Arc<Rule>>,
    /// Domain -> positions of `||domain` rules, ascending
    by_domain: HashMap<String, Vec<usize>>,
    /// Positions of every rule that is not domain anchored, ascending
    scan: Vec<usize>,
    /// Positions of substring rules, ascending
    substrings: Vec<usize>,
}

impl RulePartition {
    fn push(&mut self, rule: Arc<Rule>) {
        let pos = self.rules.len();
        match rule.pattern() {
            Pattern::Domain(domain) => {
                self.by_domain
                    .entry(domain.domain().to_string())
                    .or_default()
                    .push(pos);
            }
            Pattern::Substring(_) => {
                self.scan.push(pos);
                self.substrings.push(pos);
            }
            Pattern::Prefix(_) | Pattern::Suffix(_) | Pattern::Separator(_) => {
                self.scan.push(pos);
            }
        }
        self.rules.push(rule);
    }

    #[inline]
    pub(crate) fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    #[inline]
    pub(crate) fn domain_positions(&self, domain: &str) -> Option<&[usize]> {
        self.by_domain.get(domain).map(Vec::as_slice)
    }

    #[inline]
    pub(crate) fn scan_positions(&self) -> &[usize] {
        &self.scan
    }

    #[inline]
    pub(crate) fn substring_positions(&self) -> &[usize] {
        &self.substrings
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// Immutable snapshot of all active rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    blocks: RulePartition,
    exceptions: RulePartition,
}

impl RuleSet {
    /// Build a rule set, partitioning rules by `is_exception` and keeping the
    /// order in which they are supplied.
    pub fn new<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut set = Self::default();
        for rule in rules {
            if rule.is_exception() {
                set.exceptions.push(Arc::new(rule));
            } else {
                set.blocks.push(Arc::new(rule));
            }
        }
        set
    }

    /// A rule set that blocks nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn block_rules(&self) -> &[Arc<Rule>] {
        self.blocks.rules()
    }

    pub fn exception_rules(&self) -> &[Arc<Rule>] {
        self.exceptions.rules()
    }

    pub fn len(&self) -> usize {
        self.blocks.rules().len() + self.exceptions.rules().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count rules of each kind across both partitions.
    pub fn kind_counts(&self) -> Vec<(RuleKind, usize)> {
        let kinds = [
            RuleKind::DomainAnchor,
            RuleKind::PrefixAnchor,
            RuleKind::SuffixAnchor,
            RuleKind::SeparatorPattern,
            RuleKind::Substring,
        ];
        kinds
            .into_iter()
            .map(|kind| {
                let count = self
                    .block_rules()
                    .iter()
                    .chain(self.exception_rules())
                    .filter(|rule| rule.kind() == kind)
                    .count();
                (kind, count)
            })
            .collect()
    }

    pub(crate) fn blocks(&self) -> &RulePartition {
        &self.blocks
    }

    pub(crate) fn exceptions(&self) -> &RulePartition {
        &self.exceptions
    }
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.block_rules() == other.block_rules() && self.exception_rules() == other.exception_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: Pattern, raw: &str, is_exception: bool) -> Rule {
        Rule::new(pattern, raw, is_exception).unwrap()
    }

    #[test]
    fn partitions_by_exception_flag() {
        let set = RuleSet::new(vec![
            rule(Pattern::domain("ads.com", None).unwrap(), "||ads.com^", false),
            rule(Pattern::domain("ads.com", Some("/ok")).unwrap(), "@@||ads.com/ok^", true),
            rule(Pattern::substring("/banner/").unwrap(), "/banner/", false),
        ]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.block_rules().len(), 2);
        assert_eq!(set.exception_rules().len(), 1);
        assert_eq!(set.block_rules()[0].raw_text(), "||ads.com^");
        assert_eq!(set.block_rules()[1].raw_text(), "/banner/");
    }

    #[test]
    fn indexes_domain_rules() {
        let set = RuleSet::new(vec![
            rule(Pattern::substring("pixel").unwrap(), "pixel", false),
            rule(Pattern::domain("ads.com", None).unwrap(), "||ads.com^", false),
            rule(Pattern::prefix("https://x.com/").unwrap(), "|https://x.com/", false),
            rule(Pattern::domain("ads.com", Some("/a")).unwrap(), "||ads.com/a", false),
        ]);

        let blocks = set.blocks();
        assert_eq!(blocks.domain_positions("ads.com"), Some(&[1usize, 3][..]));
        assert_eq!(blocks.domain_positions("other.com"), None);
        assert_eq!(blocks.scan_positions(), &[0, 2]);
        assert_eq!(blocks.substring_positions(), &[0]);
    }

    #[test]
    fn empty_set() {
        let set = RuleSet::empty();
        assert!(set.is_empty());
        assert_eq!(set, RuleSet::new(Vec::new()));
    }

    #[test]
    fn counts_kinds() {
        let set = RuleSet::new(vec![
            rule(Pattern::domain("ads.com", None).unwrap(), "||ads.com^", false),
            rule(Pattern::domain("ok.com", None).unwrap(), "@@||ok.com^", true),
            rule(Pattern::suffix(".gif").unwrap(), ".gif|", false),
        ]);
        let counts = set.kind_counts();
        assert!(counts.contains(&(RuleKind::DomainAnchor, 2)));
        assert!(counts.contains(&(RuleKind::SuffixAnchor, 1)));
        assert!(counts.contains(&(RuleKind::Substring, 0)));
    }
}
