//! Allow-list pattern handling
//!
//! Allow patterns use the match-pattern syntax `scheme://[*.]host/path`.
//! For rule compilation each pattern collapses to a bare hostname that is
//! added to every rule's excluded domains. [`MatchPattern`] keeps the full
//! pattern for testing whether a page URL is allowed.

use crate::error::{Error, Result};
use tracing::debug;
use url::Url;

const SCHEME_SEPARATOR: &str = "://";

/// Bare hostname an allow pattern excludes from blocking
///
/// `*://*.example.com/*` becomes `example.com` and `*://*.www.9anime.to/*`
/// becomes `9anime.to`.
pub fn pattern_host(pattern: &str) -> Result<String> {
    let pattern = pattern.trim();
    let (scheme, rest) = pattern
        .split_once(SCHEME_SEPARATOR)
        .ok_or_else(|| Error::invalid_pattern(pattern, "missing scheme separator"))?;

    let scheme = match scheme {
        "*" => "https",
        "" => return Err(Error::invalid_pattern(pattern, "empty scheme")),
        other => other,
    };

    let host = rest.split('/').next().unwrap_or_default();
    let host = host.strip_prefix("*.").unwrap_or(host);
    if host.is_empty() || host.contains('*') {
        return Err(Error::invalid_pattern(pattern, "host must be a concrete domain"));
    }

    let url = Url::parse(&format!("{scheme}{SCHEME_SEPARATOR}{host}/"))
        .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
    let parsed = url
        .host_str()
        .ok_or_else(|| Error::invalid_pattern(pattern, "no host"))?;

    let bare = parsed.strip_prefix("www.").unwrap_or(parsed);
    if bare.is_empty() {
        return Err(Error::invalid_pattern(pattern, "no host"));
    }
    Ok(bare.to_string())
}

/// Deduplicated excluded domains for a set of allow patterns
///
/// Malformed patterns are skipped; first-seen order is kept.
pub fn excluded_domains<P: AsRef<str>>(patterns: &[P]) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        match pattern_host(pattern.as_ref()) {
            Ok(host) if !hosts.contains(&host) => hosts.push(host),
            Ok(_) => {}
            Err(e) => debug!(pattern = pattern.as_ref(), error = %e, "Skipping allow pattern"),
        }
    }
    hosts
}

/// Allow pattern covering every page on the URL's host
pub fn allow_pattern_for(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::invalid_url(url, "URL has no host"))?;
    Ok(format!("*://*.{host}/*"))
}

/// Parsed match pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    scheme: String,
    host: HostPattern,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    /// `*.example.com`: the domain itself or any subdomain
    Suffix(String),
    Exact(String),
}

impl MatchPattern {
    /// Parse `scheme://host/path`
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        let (scheme, rest) = pattern
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| Error::invalid_pattern(pattern, "missing scheme separator"))?;
        if scheme.is_empty() {
            return Err(Error::invalid_pattern(pattern, "empty scheme"));
        }

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/*"),
        };

        let host = host.to_ascii_lowercase();
        let host = if host == "*" {
            HostPattern::Any
        } else if let Some(suffix) = host.strip_prefix("*.") {
            HostPattern::Suffix(suffix.to_string())
        } else if host.is_empty() || host.contains('*') {
            return Err(Error::invalid_pattern(pattern, "wildcard must lead the host"));
        } else {
            HostPattern::Exact(host)
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host,
            path: path.to_string(),
        })
    }

    /// Whether `url` falls under this pattern
    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match self.scheme.as_str() {
            "*" => matches!(url.scheme(), "http" | "https"),
            s => s == url.scheme(),
        };
        if !scheme_ok {
            return false;
        }

        let host = url.host_str().unwrap_or_default();
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(h) => host == h,
            HostPattern::Suffix(s) => host == s || host.ends_with(&format!(".{s}")),
        };
        if !host_ok {
            return false;
        }

        let target = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        glob_match(&self.path, &target)
    }
}

/// `*`-only glob match over the whole input
fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern = pattern.as_bytes();
    let input = input.as_bytes();
    let (mut p, mut i) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while i < input.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, i));
            p += 1;
        } else if p < pattern.len() && pattern[p] == input[i] {
            p += 1;
            i += 1;
        } else if let Some((sp, si)) = star {
            p = sp + 1;
            i = si + 1;
            star = Some((sp, si + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}
