//! Typed storage repository

use super::{keys, KeyValueStore, MemoryStore};
use crate::blocklist::DEFAULT_ALLOWED_SITES;
use crate::error::{Error, Result};
use crate::rules::{allow_pattern_for, MatchPattern};
use crate::settings::{UserSettings, SETTINGS_VERSION};
use crate::tracker::PerformanceStats;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Hostname to detection count
pub type TrackerTally = BTreeMap<String, u64>;

/// Storage area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Device-local data
    Local,
    /// Data that follows the user across devices
    Sync,
}

/// Typed access to everything the engine persists
///
/// Reads used on hot paths degrade to defaults when the store fails or
/// holds something unreadable; writes report errors to the caller.
#[derive(Clone)]
pub struct Storage {
    local: Arc<dyn KeyValueStore>,
    sync: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Build a repository over the two areas
    pub fn new(local: Arc<dyn KeyValueStore>, sync: Arc<dyn KeyValueStore>) -> Self {
        Self { local, sync }
    }

    /// Repository backed by two fresh [`MemoryStore`]s
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    fn area(&self, area: Area) -> &dyn KeyValueStore {
        match area {
            Area::Local => self.local.as_ref(),
            Area::Sync => self.sync.as_ref(),
        }
    }

    /// Read and decode a key
    pub async fn read<T: DeserializeOwned>(&self, area: Area, key: &str) -> Result<Option<T>> {
        match self.area(area).get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::storage(key, e.to_string())),
        }
    }

    /// Encode and write a key
    pub async fn write<T: Serialize + ?Sized>(&self, area: Area, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.area(area).set(key, value).await
    }

    /// Delete a key
    pub async fn remove(&self, area: Area, key: &str) -> Result<()> {
        self.area(area).remove(key).await
    }

    async fn read_or_default<T: DeserializeOwned + Default>(&self, area: Area, key: &str) -> T {
        match self.read(area, key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key, error = %e, "Storage read failed; using default");
                T::default()
            }
        }
    }

    // =========== Initialization ===========

    /// Migrate settings if needed and seed missing records
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let version: u32 = self.read(Area::Local, keys::SETTINGS_VERSION).await?.unwrap_or(0);
        if version < SETTINGS_VERSION {
            self.migrate(version).await?;
        }

        if self.read::<Value>(Area::Local, keys::TRACKERS).await?.is_none() {
            self.write(Area::Local, keys::TRACKERS, &TrackerTally::new()).await?;
        }
        if self.read::<Value>(Area::Sync, keys::ALLOWED_SITES).await?.is_none() {
            self.write(Area::Sync, keys::ALLOWED_SITES, DEFAULT_ALLOWED_SITES).await?;
        }
        if self.read::<Value>(Area::Local, keys::PERFORMANCE_STATS).await?.is_none() {
            self.write(Area::Local, keys::PERFORMANCE_STATS, &PerformanceStats::default())
                .await?;
        }

        debug!("Storage initialized");
        Ok(())
    }

    /// Forward-migrate the settings record from `previous`
    pub async fn migrate(&self, previous: u32) -> Result<UserSettings> {
        info!(from = previous, to = SETTINGS_VERSION, "Migrating settings");
        let stored = self.local.get(keys::SETTINGS).await?;
        let settings = UserSettings::migrate(stored.as_ref());

        self.write(Area::Local, keys::SETTINGS, &settings).await?;
        self.write(Area::Local, keys::SETTINGS_VERSION, &SETTINGS_VERSION).await?;
        Ok(settings)
    }

    // =========== Settings ===========

    /// Current settings, or defaults if none can be read
    pub async fn load_settings(&self) -> UserSettings {
        match self.local.get(keys::SETTINGS).await {
            Ok(stored) => UserSettings::migrate(stored.as_ref()),
            Err(e) => {
                warn!(error = %e, "Failed to load settings; using defaults");
                UserSettings::default()
            }
        }
    }

    /// Persist settings, stamped with the current version
    pub async fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let mut settings = settings.clone();
        settings.version = SETTINGS_VERSION;
        self.write(Area::Local, keys::SETTINGS, &settings).await
    }

    /// Restore default settings
    pub async fn reset_settings(&self) -> Result<UserSettings> {
        let settings = UserSettings::default();
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    // =========== Allow-list ===========

    /// Stored allow patterns, in insertion order
    pub async fn allowed_sites(&self) -> Vec<String> {
        self.read_or_default(Area::Sync, keys::ALLOWED_SITES).await
    }

    /// Replace the allow patterns
    pub async fn save_allowed_sites(&self, patterns: &[String]) -> Result<()> {
        self.write(Area::Sync, keys::ALLOWED_SITES, patterns).await
    }

    /// Allow every page on `url`'s host
    ///
    /// Returns `false` if the host was already allowed.
    pub async fn allow_url(&self, url: &str) -> Result<bool> {
        let pattern = allow_pattern_for(url)?;
        let mut patterns = self.allowed_sites().await;
        if patterns.contains(&pattern) {
            return Ok(false);
        }
        patterns.push(pattern);
        self.save_allowed_sites(&patterns).await?;
        Ok(true)
    }

    /// Stop allowing `url`'s host
    ///
    /// Returns `false` if no pattern for the host was stored.
    pub async fn disallow_url(&self, url: &str) -> Result<bool> {
        let pattern = allow_pattern_for(url)?;
        let mut patterns = self.allowed_sites().await;
        let before = patterns.len();
        patterns.retain(|p| *p != pattern);
        if patterns.len() == before {
            return Ok(false);
        }
        self.save_allowed_sites(&patterns).await?;
        Ok(true)
    }

    /// Whether any stored pattern matches `url`
    pub async fn is_url_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        self.allowed_sites()
            .await
            .iter()
            .filter_map(|p| MatchPattern::parse(p).ok())
            .any(|p| p.matches(&parsed))
    }

    // =========== Tracker accounting ===========

    /// Detection counts per hostname
    pub async fn tracker_tally(&self) -> TrackerTally {
        self.read_or_default(Area::Local, keys::TRACKERS).await
    }

    /// Replace the detection counts
    pub async fn save_tracker_tally(&self, tally: &TrackerTally) -> Result<()> {
        self.write(Area::Local, keys::TRACKERS, tally).await
    }

    /// Clear the detection counts
    pub async fn reset_tracker_tally(&self) -> Result<()> {
        self.save_tracker_tally(&TrackerTally::new()).await
    }

    /// Persisted savings estimate
    pub async fn performance_stats(&self) -> PerformanceStats {
        self.read_or_default(Area::Local, keys::PERFORMANCE_STATS).await
    }

    /// Persist the savings estimate
    pub async fn save_performance_stats(&self, stats: &PerformanceStats) -> Result<()> {
        self.write(Area::Local, keys::PERFORMANCE_STATS, stats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_seeds_defaults() {
        let storage = Storage::in_memory();
        storage.initialize().await.unwrap();

        assert_eq!(storage.load_settings().await, UserSettings::default());
        assert_eq!(storage.allowed_sites().await, DEFAULT_ALLOWED_SITES);
        assert!(storage.tracker_tally().await.is_empty());
        assert_eq!(storage.performance_stats().await, PerformanceStats::default());
        let version: Option<u32> = storage.read(Area::Local, keys::SETTINGS_VERSION).await.unwrap();
        assert_eq!(version, Some(SETTINGS_VERSION));
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_records() {
        let storage = Storage::in_memory();
        storage
            .write(Area::Local, keys::SETTINGS, &json!({ "blockingEnabled": false }))
            .await
            .unwrap();
        storage
            .save_allowed_sites(&["*://*.keep.me/*".to_string()])
            .await
            .unwrap();

        storage.initialize().await.unwrap();

        assert!(!storage.load_settings().await.blocking_enabled);
        assert_eq!(storage.allowed_sites().await, vec!["*://*.keep.me/*"]);
    }

    #[tokio::test]
    async fn test_allow_and_disallow() {
        let storage = Storage::in_memory();

        assert!(storage.allow_url("https://news.example.com/a").await.unwrap());
        assert!(!storage.allow_url("http://news.example.com/b").await.unwrap());
        assert_eq!(storage.allowed_sites().await, vec!["*://*.news.example.com/*"]);

        assert!(storage.is_url_allowed("https://news.example.com/page").await);
        assert!(storage.is_url_allowed("https://a.news.example.com/").await);
        assert!(!storage.is_url_allowed("https://example.com/").await);

        assert!(storage.disallow_url("https://news.example.com/").await.unwrap());
        assert!(!storage.disallow_url("https://news.example.com/").await.unwrap());
        assert!(storage.allowed_sites().await.is_empty());
    }

    #[tokio::test]
    async fn test_allow_rejects_invalid_url() {
        let storage = Storage::in_memory();
        assert!(matches!(
            storage.allow_url("nope").await,
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_degrades() {
        let storage = Storage::in_memory();
        storage
            .write(Area::Local, keys::PERFORMANCE_STATS, &json!("corrupt"))
            .await
            .unwrap();
        assert_eq!(storage.performance_stats().await, PerformanceStats::default());
    }
}
