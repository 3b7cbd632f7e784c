//! Tracker accounting
//!
//! Folds detection reports into the persisted per-hostname tally and the
//! in-memory savings estimate, and decides when a detection deserves a
//! notification. The page-side half lives in [`observer`].

pub mod observer;

use crate::blocklist::is_high_risk;
use crate::config::TrackersConfig;
use crate::error::Result;
use crate::host::Notifier;
use crate::settings::UserSettings;
use crate::storage::Storage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Detections after which a hostname counts as frequent
pub const FREQUENT_TRACKER_THRESHOLD: u64 = 10;

/// Estimated kilobytes saved per blocked request
pub const DATA_SAVED_PER_BLOCK_KB: u64 = 50;

/// Estimated seconds saved per blocked request
pub const TIME_SAVED_PER_BLOCK_SECS: f64 = 0.2;

/// Quiet period before the page observer flushes its counts
pub const REPORT_DEBOUNCE_MS: u64 = 1000;

/// Notification title for blocked trackers
pub const NOTIFICATION_TITLE: &str = "Tracker Blocked";

/// Running savings estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceStats {
    /// Kilobytes not downloaded
    pub data_saved: u64,
    /// Seconds of load time avoided
    pub time_saved: f64,
    /// Requests blocked
    pub total_blocked: u64,
}

/// What happened to a single detection report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Reported hostname
    pub hostname: String,
    /// Tally for the hostname after this report
    pub count: u64,
    /// Hostname is on the static ad-server list
    pub high_risk: bool,
    /// A notification was raised
    pub notified: bool,
}

/// Detection tally and savings estimate
pub struct PerformanceTracker {
    storage: Storage,
    notifier: Arc<dyn Notifier>,
    accounting: TrackersConfig,
    stats: Mutex<PerformanceStats>,
}

impl std::fmt::Debug for PerformanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceTracker")
            .field("accounting", &self.accounting)
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}

impl PerformanceTracker {
    /// Create a tracker with zeroed in-memory stats
    pub fn new(storage: Storage, notifier: Arc<dyn Notifier>, accounting: TrackersConfig) -> Self {
        Self {
            storage,
            notifier,
            accounting,
            stats: Mutex::new(PerformanceStats::default()),
        }
    }

    /// Current in-memory stats
    pub fn stats(&self) -> PerformanceStats {
        self.stats.lock().clone()
    }

    /// Replace in-memory stats with the persisted record
    pub async fn load(&self) {
        let stored = self.storage.performance_stats().await;
        *self.stats.lock() = stored;
    }

    /// Persist in-memory stats
    pub async fn save(&self) -> Result<()> {
        let stats = self.stats();
        self.storage.save_performance_stats(&stats).await?;
        debug!(total_blocked = stats.total_blocked, "Performance stats saved");
        Ok(())
    }

    /// Zero the stats and persist
    pub async fn reset(&self) -> Result<()> {
        *self.stats.lock() = PerformanceStats::default();
        self.save().await?;
        info!("Performance stats reset");
        Ok(())
    }

    /// Fold one detection report
    ///
    /// The tally write is a read-modify-write with no lock around it; two
    /// reports racing for the same hostname can lose an increment.
    #[instrument(skip(self, settings))]
    pub async fn record_detection(&self, hostname: &str, settings: &UserSettings) -> Result<Detection> {
        let mut tally = self.storage.tracker_tally().await;
        let count = {
            let entry = tally.entry(hostname.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        {
            let mut stats = self.stats.lock();
            stats.total_blocked += 1;
            stats.data_saved += self.accounting.data_saved_per_block_kb;
            stats.time_saved += self.accounting.time_saved_per_block_secs;
        }

        self.storage.save_tracker_tally(&tally).await?;

        let high_risk = is_high_risk(hostname);
        let frequent = count > self.accounting.frequent_threshold;
        let notified = settings.show_notifications && (high_risk || frequent);
        if notified {
            self.notifier.notify(
                NOTIFICATION_TITLE,
                &format!("SmartBlock has blocked a tracker from: {hostname}"),
            );
        }

        if !high_risk {
            info!(hostname, count, "New tracker detected");
        }

        Ok(Detection {
            hostname: hostname.to_string(),
            count,
            high_risk,
            notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockNotifier, SilentNotifier};

    fn tracker_with(notifier: Arc<dyn Notifier>) -> (PerformanceTracker, Storage) {
        let storage = Storage::in_memory();
        let tracker = PerformanceTracker::new(storage.clone(), notifier, TrackersConfig::default());
        (tracker, storage)
    }

    #[tokio::test]
    async fn test_detection_updates_tally_and_stats() {
        let (tracker, storage) = tracker_with(Arc::new(SilentNotifier));
        let settings = UserSettings::default();

        tracker.record_detection("t.example", &settings).await.unwrap();
        let detection = tracker.record_detection("t.example", &settings).await.unwrap();

        assert_eq!(detection.count, 2);
        assert!(!detection.high_risk);
        assert!(!detection.notified);
        assert_eq!(storage.tracker_tally().await.get("t.example"), Some(&2));

        let stats = tracker.stats();
        assert_eq!(stats.total_blocked, 2);
        assert_eq!(stats.data_saved, 2 * DATA_SAVED_PER_BLOCK_KB);
        assert!((stats.time_saved - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_high_risk_notifies_when_enabled() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|title, message| title == NOTIFICATION_TITLE && message.contains("doubleclick.net"))
            .times(1)
            .return_const(());
        let (tracker, _) = tracker_with(Arc::new(notifier));

        let settings = UserSettings {
            show_notifications: true,
            ..UserSettings::default()
        };
        let detection = tracker.record_detection("doubleclick.net", &settings).await.unwrap();
        assert!(detection.high_risk);
        assert!(detection.notified);
    }

    #[tokio::test]
    async fn test_frequent_threshold_is_strict() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).return_const(());
        let (tracker, _) = tracker_with(Arc::new(notifier));
        let settings = UserSettings {
            show_notifications: true,
            ..UserSettings::default()
        };

        for _ in 0..FREQUENT_TRACKER_THRESHOLD {
            let d = tracker.record_detection("cdn.tracker.test", &settings).await.unwrap();
            assert!(!d.notified);
        }
        let d = tracker.record_detection("cdn.tracker.test", &settings).await.unwrap();
        assert!(d.notified);
    }

    #[tokio::test]
    async fn test_no_notification_when_disabled() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let (tracker, _) = tracker_with(Arc::new(notifier));

        let d = tracker
            .record_detection("doubleclick.net", &UserSettings::default())
            .await
            .unwrap();
        assert!(!d.notified);
    }

    #[tokio::test]
    async fn test_save_load_reset() {
        let (tracker, storage) = tracker_with(Arc::new(SilentNotifier));
        tracker
            .record_detection("x.test", &UserSettings::default())
            .await
            .unwrap();
        tracker.save().await.unwrap();
        assert_eq!(storage.performance_stats().await.total_blocked, 1);

        let reloaded = PerformanceTracker::new(storage.clone(), Arc::new(SilentNotifier), TrackersConfig::default());
        reloaded.load().await;
        assert_eq!(reloaded.stats().total_blocked, 1);

        reloaded.reset().await.unwrap();
        assert_eq!(storage.performance_stats().await, PerformanceStats::default());
    }
}
