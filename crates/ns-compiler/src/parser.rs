use std::collections::BTreeMap;
use std::net::IpAddr;

use log::{debug, trace};
use ns_core::{Pattern, Rule, RuleError, RuleSet};

use crate::pattern::compile_pattern;

/// Bounds on the trimmed length of a rule line, in characters.
pub const MIN_LINE_LEN: usize = 3;
pub const MAX_LINE_LEN: usize = 2048;

/// Why a line did not produce a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum Rejection {
    #[error("Blank line")]
    Blank,
    #[error("Comment or metadata")]
    Comment,
    #[error("Cosmetic rule")]
    Cosmetic,
    #[error("Length outside [3, 2048]")]
    Length,
    #[error("Unsupported option")]
    UnsupportedOption,
    #[error("Invalid domain")]
    InvalidDomain,
    #[error("Hosts entry without a blockable name")]
    HostsLocal,
    #[error("Wildcard in domain anchor path")]
    WildcardPath,
    #[error("Invalid separator pattern")]
    InvalidRegex,
    #[error("Empty pattern")]
    EmptyPattern,
}

impl From<RuleError> for Rejection {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::EmptyPattern => Self::EmptyPattern,
            RuleError::InvalidDomain(_) | RuleError::InvalidPath(_) => Self::InvalidDomain,
        }
    }
}

bitflags::bitflags! {
    /// Option tokens seen after `$` that the parser acts on. Other options
    /// are ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptionFlags: u16 {
        const SCRIPT = 1 << 0;
        const STYLESHEET = 1 << 1;
        const XMLHTTPREQUEST = 1 << 2;

        /// Options whose scope the matcher cannot honour; rules using them are dropped
        const UNSUPPORTED = Self::SCRIPT.bits() | Self::STYLESHEET.bits() | Self::XMLHTTPREQUEST.bits();
    }
}

// =============================================================================
// Line Parsing
// =============================================================================

/// Parse one filter list line. Returns None for anything that is not a
/// supported rule; never panics on malformed input.
pub fn parse_line(text: &str) -> Option<Rule> {
    classify_line(text).ok()
}

/// Parse one filter list line, reporting why it was rejected.
pub fn classify_line(text: &str) -> Result<Rule, Rejection> {
    let line = text.trim();
    if line.is_empty() {
        return Err(Rejection::Blank);
    }

    if is_comment_line(line) {
        return Err(Rejection::Comment);
    }

    check_length(line)?;

    if is_cosmetic_line(line) {
        return Err(Rejection::Cosmetic);
    }

    let (is_exception, body) = match line.strip_prefix("@@") {
        Some(rest) => {
            let rest = rest.trim_start();
            check_length(rest)?;
            (true, rest)
        }
        None => (false, line),
    };

    let (pattern_part, options_text) = split_rule_options(body);
    if let Some(options_text) = options_text {
        if parse_options(options_text).intersects(OptionFlags::UNSUPPORTED) {
            return Err(Rejection::UnsupportedOption);
        }
    }

    let pattern_str = pattern_part.trim();
    let pattern = match hosts_file_entry(pattern_str) {
        HostsEntry::Domain(domain) => Pattern::domain(domain, None)?,
        HostsEntry::Local => return Err(Rejection::HostsLocal),
        HostsEntry::NotHosts if pattern_str.contains("\\$") => compile_pattern(&pattern_str.replace("\\$", "$"))?,
        HostsEntry::NotHosts => compile_pattern(pattern_str)?,
    };

    Ok(Rule::new(pattern, line, is_exception)?)
}

fn check_length(text: &str) -> Result<(), Rejection> {
    let len = text.chars().take(MAX_LINE_LEN + 1).count();
    if (MIN_LINE_LEN..=MAX_LINE_LEN).contains(&len) {
        Ok(())
    } else {
        Err(Rejection::Length)
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[') || line.starts_with('#')
}

fn is_cosmetic_line(line: &str) -> bool {
    line.contains("##")
        || line.contains("#@#")
        || line.contains("#?#")
        || line.contains("#$#")
        || line.contains("#%#")
}

/// Split at the last `$` not preceded by a backslash.
fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut end = line.len();

    while let Some(pos) = line[..end].rfind('$') {
        if pos > 0 && bytes[pos - 1] == b'\\' {
            end = pos;
            continue;
        }
        return (&line[..pos], Some(&line[pos + 1..]));
    }

    (line, None)
}

fn parse_options(text: &str) -> OptionFlags {
    let mut flags = OptionFlags::empty();

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if raw_lower.contains("script") {
            flags |= OptionFlags::SCRIPT;
            continue;
        }
        if raw_lower.contains("stylesheet") {
            flags |= OptionFlags::STYLESHEET;
            continue;
        }
        if raw_lower.contains("xmlhttprequest") {
            flags |= OptionFlags::XMLHTTPREQUEST;
        }
    }

    flags
}

enum HostsEntry<'a> {
    /// Not a hosts-file line; compile as a filter pattern
    NotHosts,
    Domain(&'a str),
    /// Loopback aliases, bare addresses and other dotless names
    Local,
}

/// Recognise `0.0.0.0 ads.example.com` style hosts-file entries.
fn hosts_file_entry(line: &str) -> HostsEntry<'_> {
    let mut parts = line.split_whitespace();
    let Some(first) = parts.next() else {
        return HostsEntry::NotHosts;
    };
    if first.parse::<IpAddr>().is_err() {
        return HostsEntry::NotHosts;
    }

    match parts.next() {
        Some(name) if name.contains('.') && name.parse::<IpAddr>().is_err() => HostsEntry::Domain(name),
        _ => HostsEntry::Local,
    }
}

// =============================================================================
// List Parsing
// =============================================================================

/// Line counts for one parsed list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub lines: usize,
    pub rules: usize,
    pub exceptions: usize,
    pub rejected: BTreeMap<Rejection, usize>,
}

impl ParseSummary {
    /// Lines that were neither blank, comments, nor rules.
    pub fn skipped(&self) -> usize {
        self.rejected
            .iter()
            .filter(|(reason, _)| !matches!(reason, Rejection::Blank | Rejection::Comment))
            .map(|(_, count)| count)
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListParse {
    pub rules: Vec<Rule>,
    pub summary: ParseSummary,
}

/// Parse a whole filter list, tagging every rule with `list_id`.
pub fn parse_filter_list(text: &str, list_id: u16) -> ListParse {
    let mut parsed = ListParse::default();

    for raw_line in text.lines() {
        parsed.summary.lines += 1;
        match classify_line(raw_line) {
            Ok(rule) => {
                parsed.summary.rules += 1;
                if rule.is_exception() {
                    parsed.summary.exceptions += 1;
                }
                parsed.rules.push(rule.with_list_id(list_id));
            }
            Err(reason) => {
                if !matches!(reason, Rejection::Blank | Rejection::Comment) {
                    trace!("[{}] skipped {:?}: {}", list_id, raw_line, reason);
                }
                *parsed.summary.rejected.entry(reason).or_default() += 1;
            }
        }
    }

    debug!(
        "[{}] {} lines, {} rules, {} skipped",
        list_id,
        parsed.summary.lines,
        parsed.summary.rules,
        parsed.summary.skipped()
    );

    parsed
}

/// Parse several lists in order and build one rule set. List ids follow the
/// position of each list.
pub fn compile_lists<I, S>(lists: I) -> (RuleSet, Vec<ParseSummary>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut all_rules = Vec::new();
    let mut summaries = Vec::new();

    for (list_id, text) in lists.into_iter().enumerate() {
        let parsed = parse_filter_list(text.as_ref(), list_id as u16);
        all_rules.extend(parsed.rules);
        summaries.push(parsed.summary);
    }

    (RuleSet::new(all_rules), summaries)
}
