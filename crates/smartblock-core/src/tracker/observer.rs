//! Page-side tracker observation
//!
//! Watches resource loads for known tracker hosts, batches matches per
//! hostname and reports them after a quiet period. Network entry points
//! are covered by [`ReportingClient`], a decorator around whatever sends
//! requests.

use crate::host::{Clock, SystemClock};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

/// Hosts the page observer treats as trackers (substring match)
pub const KNOWN_TRACKERS: &[&str] = &[
    "doubleclick.net", "googlesyndication.com", "google-analytics.com",
    "adservice.google.com", "ads.google.com", "pagead2.googlesyndication.com",
    "googletagmanager.com", "googleadservices.com", "facebook.net", "facebook.com",
    "connect.facebook.net", "analytics.twitter.com", "t.co", "amazon-adsystem.com",
    "adsrvr.org", "adnxs.com", "criteo.com", "outbrain.com", "taboola.com",
    "hotjar.com", "scorecardresearch.com", "quantserve.com", "moatads.com",
    "contextweb.com", "media.net", "openx.net", "pubmatic.com", "mathtag.com",
    "bluekai.com", "advertising.com", "serving-sys.com", "smartadserver.com",
    "zedo.com", "tradedoubler.com", "rubiconproject.com", "yieldmo.com",
    "appsflyer.com", "mixpanel.com", "segment.io", "optimizely.com", "newrelic.com",
    "crazyegg.com", "clicktale.net", "brightcove.net", "demdex.net", "adform.net",
    "netmng.com", "ml314.com", "trustarc.com", "truste.com", "privacy-mgmt.com",
    "cloudfront.net", "yimg.com", "yahoo.com", "bing.com", "pinterest.com",
];

/// Page schemes the observer never runs on
const UNPROTECTED_SCHEMES: &[&str] = &["chrome", "chrome-extension", "moz-extension", "about"];

/// A single `trackerDetected` report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerReport {
    /// Tracker hostname
    pub hostname: String,
    /// Page the tracker was seen on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Report time in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Why a report could not be delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The receiving side is gone for good
    #[error("extension context invalidated")]
    Disconnected,
    /// Delivery failed this time
    #[error("report delivery failed: {0}")]
    Failed(String),
}

/// Destination for tracker reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one report
    async fn report(&self, report: TrackerReport) -> Result<(), SendError>;
}

/// Whether the observer should run on a page
pub fn should_protect(page_url: &str) -> bool {
    match Url::parse(page_url) {
        Ok(url) => !UNPROTECTED_SCHEMES.contains(&url.scheme()),
        Err(_) => true,
    }
}

struct Inner {
    trackers: Vec<String>,
    counts: DashMap<String, u64>,
    sink: Arc<dyn ReportSink>,
    page_url: Option<String>,
    debounce: Duration,
    enabled: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Debounced tracker observer for one page
///
/// Cloning is cheap; clones share counters and the debounce timer.
#[derive(Clone)]
pub struct TrackerObserver {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TrackerObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerObserver")
            .field("page_url", &self.inner.page_url)
            .field("debounce", &self.inner.debounce)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl TrackerObserver {
    /// Observer using [`KNOWN_TRACKERS`]
    pub fn new(sink: Arc<dyn ReportSink>, debounce: Duration) -> Self {
        Self::with_trackers(sink, debounce, KNOWN_TRACKERS.iter().map(|t| (*t).to_string()).collect())
    }

    /// Observer with a custom tracker list
    pub fn with_trackers(sink: Arc<dyn ReportSink>, debounce: Duration, trackers: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                trackers,
                counts: DashMap::new(),
                sink,
                page_url: None,
                debounce,
                enabled: AtomicBool::new(true),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Attach the page URL carried in reports
    ///
    /// Must be called before the observer is cloned.
    pub fn for_page(mut self, page_url: impl Into<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.page_url = Some(page_url.into());
        }
        self
    }

    /// Whether observation is active
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Follow the `trackerProtection` setting
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.cancel_timer();
        }
    }

    /// Whether a hostname contains any known tracker
    pub fn is_known_tracker(&self, hostname: &str) -> bool {
        self.inner.trackers.iter().any(|t| hostname.contains(t.as_str()))
    }

    /// Counter waiting to be reported for a hostname
    pub fn pending(&self, hostname: &str) -> u64 {
        self.inner.counts.get(hostname).map_or(0, |c| *c)
    }

    /// Handle one resource-timing entry
    ///
    /// Returns the tracker hostname if the entry matched. Each match restarts
    /// the debounce timer, so this must run inside a tokio runtime.
    pub fn observe_resource(&self, resource_url: &str) -> Option<String> {
        if !self.is_enabled() || !resource_url.starts_with("http") {
            return None;
        }

        let hostname = Url::parse(resource_url).ok()?.host_str()?.to_string();
        if !self.is_known_tracker(&hostname) {
            return None;
        }

        *self.inner.counts.entry(hostname.clone()).or_insert(0) += 1;
        trace!(%hostname, "Tracker resource observed");
        self.restart_timer();
        Some(hostname)
    }

    /// Report every hostname with a pending count, then zero it
    ///
    /// Stops at the first failed send; a disconnected sink also disables
    /// the observer. Returns the number of reports delivered.
    pub async fn flush(&self) -> usize {
        flush_inner(&self.inner).await
    }

    /// Page is going away: cancel the timer and report what is left
    pub async fn on_page_unload(&self) -> usize {
        self.cancel_timer();
        self.flush().await
    }

    fn restart_timer(&self) {
        let inner = Arc::clone(&self.inner);
        let debounce = self.inner.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            flush_inner(&inner).await;
        });

        if let Some(previous) = self.inner.timer.lock().replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
        }
    }
}

async fn flush_inner(inner: &Inner) -> usize {
    let pending: Vec<String> = inner
        .counts
        .iter()
        .filter(|entry| *entry.value() > 0)
        .map(|entry| entry.key().clone())
        .collect();

    let mut delivered = 0;
    for hostname in pending {
        let report = TrackerReport {
            hostname: hostname.clone(),
            url: inner.page_url.clone(),
            timestamp: Some(SystemClock.now_millis()),
        };

        match inner.sink.report(report).await {
            Ok(()) => {
                if let Some(mut count) = inner.counts.get_mut(&hostname) {
                    *count = 0;
                }
                delivered += 1;
            }
            Err(SendError::Disconnected) => {
                warn!("Report sink disconnected; stopping observer");
                inner.enabled.store(false, Ordering::Release);
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to report trackers");
                break;
            }
        }
    }

    debug!(delivered, "Tracker reports flushed");
    delivered
}

/// Something that issues network requests
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Response type
    type Response: Send;

    /// Send a request to `url`
    async fn send(&self, url: &str) -> Self::Response;
}

/// Decorator that reports tracker requests before forwarding them
///
/// The wrapped sender sees the call unchanged and its response is returned
/// as-is. Reports are fire-and-forget.
#[derive(Debug, Clone)]
pub struct ReportingClient<C> {
    inner: C,
    observer: TrackerObserver,
}

impl<C: RequestSender> ReportingClient<C> {
    /// Wrap `inner`
    pub fn new(inner: C, observer: TrackerObserver) -> Self {
        Self { inner, observer }
    }

    /// The wrapped sender
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Report if `url` is a tracker, then forward
    pub async fn send(&self, url: &str) -> C::Response {
        if self.observer.is_enabled() {
            if let Some(hostname) = tracker_hostname(&self.observer, url) {
                let report = TrackerReport {
                    hostname,
                    url: self.observer.inner.page_url.clone(),
                    timestamp: None,
                };
                if let Err(e) = self.observer.inner.sink.report(report).await {
                    debug!(error = %e, "Interceptor report dropped");
                }
            }
        }
        self.inner.send(url).await
    }
}

fn tracker_hostname(observer: &TrackerObserver, url: &str) -> Option<String> {
    if !observer.inner.trackers.iter().any(|t| url.contains(t.as_str())) {
        return None;
    }
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        Err(_) => {
            debug!(url, "Failed to parse intercepted URL");
            None
        }
    }
}
