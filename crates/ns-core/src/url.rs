//! Fast URL parsing utilities for the hot path
//!
//! These functions work directly on string slices. The only allocation is
//! lower-casing a host that contains upper-case ASCII.

use std::borrow::Cow;

// =============================================================================
// Scheme Extraction
// =============================================================================

/// Get the position after "://".
/// Returns None if the URL has no valid `scheme://` prefix.
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[0].is_ascii_alphabetic() {
        return None;
    }

    if !bytes[..colon_pos]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
    {
        return None;
    }

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Position
// =============================================================================

/// Get the start and end positions of the hostname in a URL, plus the end of
/// the authority (host and port).
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Authority ends at the first of: '/', '?', '#', or end of string
    let authority_end = bytes[scheme_end..]
        .iter()
        .position(|&b| b == b'/' || b == b'?' || b == b'#')
        .map_or(bytes.len(), |i| scheme_end + i);

    // Skip userinfo
    let host_start = bytes[scheme_end..authority_end]
        .iter()
        .rposition(|&b| b == b'@')
        .map_or(scheme_end, |i| scheme_end + i + 1);

    // IPv6 literals keep their brackets, everything else stops at the port
    let host_end = if bytes.get(host_start) == Some(&b'[') {
        bytes[host_start..authority_end]
            .iter()
            .position(|&b| b == b']')
            .map_or(authority_end, |i| host_start + i + 1)
    } else {
        bytes[host_start..authority_end]
            .iter()
            .position(|&b| b == b':')
            .map_or(authority_end, |i| host_start + i)
    };

    Some((host_start, host_end, authority_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end, _) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

// =============================================================================
// Request URL
// =============================================================================

/// Structured view of a request URL used by host and path anchored rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl<'a> {
    /// Lower-cased host without a trailing dot
    pub host: Cow<'a, str>,
    /// Everything after the host and port: path, query and fragment
    pub rest: &'a str,
}

/// Parse the parts of a URL needed for matching.
///
/// Returns None when the URL has no `scheme://` prefix, an empty host, or a
/// host containing whitespace or control characters.
pub fn parse_request_url(url: &str) -> Option<RequestUrl<'_>> {
    let (host_start, host_end, authority_end) = get_host_position(url)?;
    let host = url[host_start..host_end].trim_end_matches('.');

    if host.is_empty() || host.bytes().any(|b| b <= b' ' || b == 0x7f) {
        return None;
    }

    let host = if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    };

    Some(RequestUrl {
        host,
        rest: &url[authority_end..],
    })
}

// =============================================================================
// Domain Helpers
// =============================================================================

/// Check whether `host` equals `domain` or is a subdomain of it.
/// Both arguments are expected to be lower-case.
#[inline]
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    if host.len() == domain.len() {
        return host == domain;
    }

    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// Iterate over a host and each of its parent domains, longest first.
///
/// `ads.example.com` yields `ads.example.com`, `example.com`, `com`.
pub fn host_suffixes(host: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(host), |h| {
        let h: &str = *h;
        h.find('.').map(|pos| &h[pos + 1..])
    })
    .filter(|suffix| !suffix.is_empty())
}
