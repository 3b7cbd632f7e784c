//! Built-in domain lists
//!
//! The static ad-server list that is always blocked, the default allow
//! patterns seeded on first run, and list assembly.

use crate::rules::normalize_domain;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Ad servers blocked regardless of the remote tracker directory
pub const STATIC_AD_SERVERS: &[&str] = &[
    "partner.googleadservices.com",
    "googlesyndication.com",
    "google-analytics.com",
    "doubleclick.net",
    "facebook.com",
    "adservice.google.com",
    "pagead2.googlesyndication.com",
    "analytics.twitter.com",
    "amazon-adsystem.com",
    "scorecardresearch.com",
];

/// Allow patterns written to sync storage on first run
pub const DEFAULT_ALLOWED_SITES: &[&str] = &["*://*.www.9anime.to/*", "*://*.www.forbes.com/*"];

static HIGH_RISK: Lazy<HashSet<&'static str>> = Lazy::new(|| STATIC_AD_SERVERS.iter().copied().collect());

/// Whether a hostname is on the static ad-server list
pub fn is_high_risk(hostname: &str) -> bool {
    HIGH_RISK.contains(hostname)
}

/// The static list as owned strings
pub fn static_domains() -> Vec<String> {
    STATIC_AD_SERVERS.iter().map(|d| (*d).to_string()).collect()
}

/// Merge domain lists into one ordered, duplicate-free list
///
/// Earlier lists win, so the static list keeps its positions ahead of
/// anything fetched. Domains are normalized before comparison.
pub fn merge_domains<S: AsRef<str>>(lists: &[&[S]]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for domain in list.iter().filter_map(|d| normalize_domain(d.as_ref())) {
            if seen.insert(domain.clone()) {
                merged.push(domain);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_list() {
        assert_eq!(STATIC_AD_SERVERS.len(), 10);
        assert!(is_high_risk("doubleclick.net"));
        assert!(!is_high_risk("example.com"));
    }

    #[test]
    fn test_merge_keeps_first_position() {
        let static_list = ["a.com", "b.com"];
        let dynamic = ["c.com", "A.com", "b.com."];
        let merged = merge_domains(&[&static_list[..], &dynamic[..]]);
        assert_eq!(merged, vec!["a.com", "b.com", "c.com"]);
    }
}
