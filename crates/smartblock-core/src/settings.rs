//! User settings
//!
//! The toggles a user controls, persisted under `userSettings` with a
//! schema version under `settingsVersion`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Current settings schema version
pub const SETTINGS_VERSION: u32 = 1;

/// User-controlled toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Master switch for rule installation
    pub blocking_enabled: bool,
    /// Page-side tracker observation
    pub tracker_protection: bool,
    /// Fingerprint noise (page side only)
    pub fingerprint_protection: bool,
    /// Merge the remote tracker directory into the block list
    pub auto_update_lists: bool,
    /// Show a notification for high-risk or frequent trackers
    pub show_notifications: bool,
    /// Schema version the record was written with
    pub version: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            tracker_protection: true,
            fingerprint_protection: false,
            auto_update_lists: true,
            show_notifications: false,
            version: SETTINGS_VERSION,
        }
    }
}

impl UserSettings {
    /// Bring a stored record up to the current schema
    ///
    /// Defaults are laid down first and every stored key overrides them,
    /// so fields added in later versions appear with their default value.
    /// A stored value of the wrong type is dropped field by field; the rest
    /// of the record survives. Unknown keys are dropped and the version is
    /// stamped current.
    pub fn migrate(stored: Option<&Value>) -> Self {
        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        if let Some(Value::Object(stored)) = stored {
            for (key, value) in stored {
                let Some(default) = merged.get(key) else {
                    continue;
                };
                if same_kind(default, value) {
                    merged.insert(key.clone(), value.clone());
                } else if !value.is_null() {
                    debug!(%key, "Ignoring stored setting with unexpected type");
                }
            }
        }

        let mut settings: Self = serde_json::from_value(Value::Object(merged)).unwrap_or_default();
        settings.version = SETTINGS_VERSION;
        settings
    }

    /// Apply a single `key = value` update using the stored key names
    pub fn set_field(&mut self, key: &str, value: bool) -> bool {
        let slot = match key {
            "blockingEnabled" => &mut self.blocking_enabled,
            "trackerProtection" => &mut self.tracker_protection,
            "fingerprintProtection" => &mut self.fingerprint_protection,
            "autoUpdateLists" => &mut self.auto_update_lists,
            "showNotifications" => &mut self.show_notifications,
            _ => return false,
        };
        *slot = value;
        true
    }
}

fn same_kind(default: &Value, stored: &Value) -> bool {
    match (default, stored) {
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Number(_), Value::Number(n)) => n.is_u64(),
        _ => false,
    }
}
