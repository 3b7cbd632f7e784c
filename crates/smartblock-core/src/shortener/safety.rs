//! Destination safety heuristics
//!
//! Cheap checks run before redirecting through a short link. A hit only
//! means the destination deserves a warning instead of an automatic
//! redirect.

use std::fmt;
use url::{Host, Url};

const SUSPICIOUS_TLDS: &[&str] = &["top", "xyz", "tk", "ml", "ga", "cf", "gq", "info"];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "signin", "account", "secure", "banking", "password", "verify",
    "wallet", "blockchain", "bitcoin", "crypto", "authenticate", "security",
];

const MAX_HOST_LABELS: usize = 4;

/// Why a destination looks suspicious
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suspicion {
    /// Does not parse as a URL
    Unparsable,
    /// TLD popular with phishing campaigns
    Tld(String),
    /// Credential or finance bait in the URL
    Keyword(&'static str),
    /// Host is a bare IP address
    IpHost,
    /// Host has more labels than a normal site
    DeepSubdomain(usize),
}

impl fmt::Display for Suspicion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparsable => write!(f, "URL cannot be parsed"),
            Self::Tld(tld) => write!(f, "suspicious top-level domain '.{tld}'"),
            Self::Keyword(k) => write!(f, "contains '{k}'"),
            Self::IpHost => write!(f, "host is an IP address"),
            Self::DeepSubdomain(n) => write!(f, "{n} host labels"),
        }
    }
}

/// First reason `url` looks suspicious, if any
pub fn assess_url(url: &str) -> Option<Suspicion> {
    let Ok(parsed) = Url::parse(url) else {
        return Some(Suspicion::Unparsable);
    };

    let host = match parsed.host() {
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => return Some(Suspicion::IpHost),
        Some(Host::Domain(domain)) => domain.to_ascii_lowercase(),
        None => String::new(),
    };

    if let Some(tld) = host.rsplit('.').next() {
        if SUSPICIOUS_TLDS.contains(&tld) {
            return Some(Suspicion::Tld(tld.to_string()));
        }
    }

    let lowered = url.to_ascii_lowercase();
    if let Some(keyword) = SUSPICIOUS_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        return Some(Suspicion::Keyword(*keyword));
    }

    let labels = host.split('.').count();
    if labels > MAX_HOST_LABELS {
        return Some(Suspicion::DeepSubdomain(labels));
    }

    None
}

/// Whether `url` should get a warning before redirecting
pub fn is_suspicious_url(url: &str) -> bool {
    assess_url(url).is_some()
}
