//! Request/response protocol
//!
//! JSON messages exchanged between UI surfaces, page observers and the
//! background service. Requests are tagged by `type`.

use crate::shortener::{ShortenerStats, UrlMappings};
use crate::tracker::observer::TrackerReport;
use crate::tracker::PerformanceStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Incoming request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Rebuild and reconcile the rule set
    RefreshRules,
    /// A page observer saw a tracker
    TrackerDetected {
        /// Tracker hostname
        hostname: String,
        /// Page URL
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Report time, epoch ms
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    /// Read the savings estimate
    GetPerformanceStats,
    /// Zero the savings estimate
    ResetStats,
    /// Create a short link
    ShortenUrl {
        /// Destination
        url: String,
        /// Days until expiry; 0 never expires
        #[serde(default, rename = "expirationDays", skip_serializing_if = "Option::is_none")]
        expiration_days: Option<u32>,
    },
    /// Look up a short link
    ResolveShortUrl {
        /// Short hash
        hash: String,
    },
    /// List stored short links
    GetRecentUrls,
    /// Delete one short link
    DeleteUrl {
        /// Short hash
        hash: String,
    },
    /// Delete all short links
    ClearUrlHistory,
    /// Read shortener counters
    GetShortenerStats,
    /// Zero shortener counters
    ResetShortenerStats,
}

impl Request {
    /// Wire name of the request type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RefreshRules => "refreshRules",
            Self::TrackerDetected { .. } => "trackerDetected",
            Self::GetPerformanceStats => "getPerformanceStats",
            Self::ResetStats => "resetStats",
            Self::ShortenUrl { .. } => "shortenUrl",
            Self::ResolveShortUrl { .. } => "resolveShortUrl",
            Self::GetRecentUrls => "getRecentUrls",
            Self::DeleteUrl { .. } => "deleteUrl",
            Self::ClearUrlHistory => "clearUrlHistory",
            Self::GetShortenerStats => "getShortenerStats",
            Self::ResetShortenerStats => "resetShortenerStats",
        }
    }
}

impl From<TrackerReport> for Request {
    fn from(report: TrackerReport) -> Self {
        Self::TrackerDetected {
            hostname: report.hostname,
            url: report.url,
            timestamp: report.timestamp,
        }
    }
}

/// Outgoing response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// `{success, error?}`
    Ack {
        /// Whether the request succeeded
        success: bool,
        /// Failure description
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// `{success: true, shortUrl}`
    ShortUrl {
        /// Always true
        success: bool,
        /// Created link
        #[serde(rename = "shortUrl")]
        short_url: String,
    },
    /// Savings estimate
    PerformanceStats(PerformanceStats),
    /// Shortener counters
    ShortenerStats(ShortenerStats),
    /// Destination or `null`
    ResolvedUrl(Option<String>),
    /// Stored short links
    UrlMappings(UrlMappings),
    /// Whether a delete removed something
    Deleted(bool),
}

impl Response {
    /// `{success: true}`
    pub fn ok() -> Self {
        Self::Ack {
            success: true,
            error: None,
        }
    }

    /// `{success: false, error}`
    pub fn failure(error: impl fmt::Display) -> Self {
        Self::Ack {
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// Whether the response reports success
    pub fn is_success(&self) -> bool {
        match self {
            Self::Ack { success, .. } | Self::ShortUrl { success, .. } => *success,
            Self::ResolvedUrl(url) => url.is_some(),
            Self::Deleted(deleted) => *deleted,
            Self::PerformanceStats(_) | Self::ShortenerStats(_) | Self::UrlMappings(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_names() {
        let request: Request = serde_json::from_value(json!({ "type": "refreshRules" })).unwrap();
        assert_eq!(request, Request::RefreshRules);

        let request: Request =
            serde_json::from_value(json!({ "type": "shortenUrl", "url": "https://x.test", "expirationDays": 7 }))
                .unwrap();
        assert_eq!(
            request,
            Request::ShortenUrl {
                url: "https://x.test".into(),
                expiration_days: Some(7)
            }
        );
        assert_eq!(request.kind(), "shortenUrl");

        let request: Request = serde_json::from_value(json!({
            "type": "trackerDetected",
            "hostname": "criteo.com",
            "url": "https://news.test/",
            "timestamp": 1700000000000u64
        }))
        .unwrap();
        assert!(matches!(request, Request::TrackerDetected { ref hostname, .. } if hostname == "criteo.com"));
    }

    #[test]
    fn test_unknown_request_rejected() {
        assert!(serde_json::from_value::<Request>(json!({ "type": "explode" })).is_err());
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(serde_json::to_value(Response::ok()).unwrap(), json!({ "success": true }));
        assert_eq!(
            serde_json::to_value(Response::failure("boom")).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
        assert_eq!(
            serde_json::to_value(Response::ShortUrl {
                success: true,
                short_url: "https://sb.link/abc".into()
            })
            .unwrap(),
            json!({ "success": true, "shortUrl": "https://sb.link/abc" })
        );
        assert_eq!(serde_json::to_value(Response::ResolvedUrl(None)).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Response::Deleted(false)).unwrap(), json!(false));
    }
}
