//! # SmartBlock Platform
//!
//! Host-side implementations of the engine's collaborator traits:
//!
//! - [`DynamicRuleTable`] - bounded rule table with all-or-nothing updates
//! - [`JsonFileStore`] - key-value storage persisted as JSON files
//! - [`HttpTrackerDirectory`] - remote tracker list over HTTPS
//! - [`LogNotifier`] - notifications written to the log

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod error;
mod fsutil;
pub mod notify;
pub mod rule_table;
pub mod store;

pub use directory::HttpTrackerDirectory;
pub use error::{PlatformError, Result};
pub use notify::LogNotifier;
pub use rule_table::DynamicRuleTable;
pub use store::{open_storage, JsonFileStore};

/// File name of the persisted rule table
pub const RULES_FILE: &str = "rules.json";
