//! Persistent storage
//!
//! A key-value abstraction with last-write-wins semantics and no
//! multi-key transactions, plus the typed repository the engine uses.

mod memory;
mod repository;

pub use memory::MemoryStore;
pub use repository::{Area, Storage, TrackerTally};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Storage keys
pub mod keys {
    /// [`crate::settings::UserSettings`] record
    pub const SETTINGS: &str = "userSettings";
    /// Schema version of the settings record
    pub const SETTINGS_VERSION: &str = "settingsVersion";
    /// Hostname to detection count
    pub const TRACKERS: &str = "trackers";
    /// [`crate::tracker::PerformanceStats`] record
    pub const PERFORMANCE_STATS: &str = "stats";
    /// Allow patterns (sync area)
    pub const ALLOWED_SITES: &str = "storedArray";
    /// Short hash to URL record
    pub const URL_MAPPINGS: &str = "urlMappings";
    /// Shortener counters
    pub const SHORTENER_STATS: &str = "shortenerStats";
}

/// Async key-value store holding JSON values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a key, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently present
    async fn keys(&self) -> Result<Vec<String>>;
}
