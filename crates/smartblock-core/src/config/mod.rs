//! Configuration management for SmartBlock
//!
//! Provides a strongly-typed configuration system with TOML support.
//! User-facing toggles live in [`crate::settings::UserSettings`]; this file
//! covers how the engine itself runs.

use crate::error::{Error, Result};
use crate::reconcile::DiffStrategy;
use crate::rules::ResourceTypes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default remote tracker directory
pub const DEFAULT_DIRECTORY_URL: &str = "https://whotracks.me/trackers.json";

/// Longest accepted timer period (one year)
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General application settings
    pub general: GeneralConfig,

    /// Rule compilation
    pub blocking: BlockingConfig,

    /// Remote list updates and timers
    pub updates: UpdatesConfig,

    /// Snapshot diffing
    pub reconcile: ReconcileConfig,

    /// Host rule table limits
    pub host: HostConfig,

    /// Detection accounting
    pub trackers: TrackersConfig,

    /// Local URL shortener
    pub shortener: ShortenerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (key, minutes) in [
            ("updates.update_interval_minutes", self.updates.update_interval_minutes),
            ("updates.stats_interval_minutes", self.updates.stats_interval_minutes),
        ] {
            if !(1..=MAX_INTERVAL_MINUTES).contains(&minutes) {
                return Err(Error::config_value(
                    key,
                    format!("Must be between 1 and {MAX_INTERVAL_MINUTES}"),
                ));
            }
        }
        if self.updates.fetch_timeout_secs == 0 {
            return Err(Error::config_value("updates.fetch_timeout_secs", "Must be at least 1"));
        }
        Url::parse(&self.updates.directory_url)
            .map_err(|e| Error::config_value("updates.directory_url", e.to_string()))?;

        if self.blocking.resource_types.is_empty() {
            return Err(Error::config_value("blocking.resource_types", "At least one type is required"));
        }

        if self.host.max_rules == 0 {
            return Err(Error::config_value("host.max_rules", "Must be at least 1"));
        }

        if self.trackers.debounce_ms == 0 {
            return Err(Error::config_value("trackers.debounce_ms", "Must be at least 1"));
        }
        if !self.trackers.time_saved_per_block_secs.is_finite() || self.trackers.time_saved_per_block_secs < 0.0 {
            return Err(Error::config_value(
                "trackers.time_saved_per_block_secs",
                "Must be a non-negative number",
            ));
        }

        if !(4..=8).contains(&self.shortener.hash_length) {
            return Err(Error::config_value("shortener.hash_length", "Must be between 4 and 8"));
        }
        if self.shortener.max_probes == 0 {
            return Err(Error::config_value("shortener.max_probes", "Must be at least 1"));
        }
        let base = Url::parse(&self.shortener.base_url)
            .map_err(|e| Error::config_value("shortener.base_url", e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(Error::config_value("shortener.base_url", "Must be a hierarchical URL"));
        }

        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Directory holding persisted state
    pub fn data_dir(&self) -> PathBuf {
        self.general
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".smartblock"))
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Instance name, used in logs
    pub name: String,
    /// Where storage files live (None = platform default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            data_dir: None,
        }
    }
}

/// Rule compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Domains blocked in addition to the built-in list
    pub extra_domains: Vec<String>,
    /// Request kinds every rule covers
    pub resource_types: ResourceTypes,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            extra_domains: Vec::new(),
            resource_types: ResourceTypes::default(),
        }
    }
}

/// Remote list updates and periodic timers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// Tracker directory endpoint
    pub directory_url: String,
    /// Rule refresh period
    pub update_interval_minutes: u64,
    /// Stats flush period
    pub stats_interval_minutes: u64,
    /// Directory request timeout
    pub fetch_timeout_secs: u64,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            update_interval_minutes: 1440,
            stats_interval_minutes: 30,
            fetch_timeout_secs: 15,
        }
    }
}

impl UpdatesConfig {
    /// Rule refresh period
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes.saturating_mul(60))
    }

    /// Stats flush period
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_minutes.saturating_mul(60))
    }

    /// Directory request timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Snapshot diffing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Comparison strategy
    pub diff: DiffStrategy,
    /// Serialize overlapping refreshes
    pub single_flight: bool,
}

/// Host rule table limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Maximum number of dynamic rules the host accepts
    pub max_rules: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { max_rules: 5000 }
    }
}

/// Detection accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackersConfig {
    /// Detections after which a hostname counts as frequent
    pub frequent_threshold: u64,
    /// Estimated kilobytes saved per blocked request
    pub data_saved_per_block_kb: u64,
    /// Estimated seconds saved per blocked request
    pub time_saved_per_block_secs: f64,
    /// Quiet period before the page observer reports
    pub debounce_ms: u64,
}

impl Default for TrackersConfig {
    fn default() -> Self {
        Self {
            frequent_threshold: crate::tracker::FREQUENT_TRACKER_THRESHOLD,
            data_saved_per_block_kb: crate::tracker::DATA_SAVED_PER_BLOCK_KB,
            time_saved_per_block_secs: crate::tracker::TIME_SAVED_PER_BLOCK_SECS,
            debounce_ms: crate::tracker::REPORT_DEBOUNCE_MS,
        }
    }
}

/// Local URL shortener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortenerConfig {
    /// Prefix of generated short URLs
    pub base_url: String,
    /// Hex characters in a short hash
    pub hash_length: usize,
    /// Rehash attempts before giving up on a collision
    pub max_probes: u32,
    /// Expiry applied when a request does not give one (0 = never)
    pub default_expiration_days: u32,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sb.link".to_string(),
            hash_length: 8,
            max_probes: 16,
            default_expiration_days: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stdout only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_timers() {
        let config = Config::default();
        assert_eq!(config.updates.update_interval(), Duration::from_secs(1440 * 60));
        assert_eq!(config.updates.stats_interval(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [reconcile]
            diff = "by-id"

            [blocking]
            resource_types = ["script", "sub_frame"]
            "#,
        )
        .unwrap();

        assert_eq!(config.reconcile.diff, DiffStrategy::ById);
        assert_eq!(
            config.blocking.resource_types,
            ResourceTypes::SCRIPT | ResourceTypes::SUB_FRAME
        );
        assert_eq!(config.host.max_rules, 5000);
        assert_eq!(config.trackers.frequent_threshold, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.shortener.hash_length = 12;
        assert!(matches!(config.validate(), Err(Error::ConfigValue { ref key, .. }) if key == "shortener.hash_length"));

        let mut config = Config::default();
        config.updates.update_interval_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.updates.stats_interval_minutes = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::ConfigValue { ref key, .. }) if key == "updates.stats_interval_minutes"));
        assert_eq!(config.updates.stats_interval(), Duration::from_secs(u64::MAX));

        let mut config = Config::default();
        config.updates.update_interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.shortener.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.blocking.resource_types = ResourceTypes::empty();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/smartblock.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}
