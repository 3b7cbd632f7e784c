//! Error types for smartblock-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Main error type for smartblock-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Allow-list pattern could not be translated into a hostname
    #[error("Invalid allow pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// URL failed validation
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Key-value storage failure
    #[error("Storage error on '{key}': {message}")]
    Storage {
        /// Storage key being accessed
        key: String,
        /// Error message
        message: String,
    },

    /// The host refused a rule update
    #[error("Host rejected rule update: {0}")]
    Host(String),

    /// Rule update would exceed the host's rule budget
    #[error("Rule quota exceeded: {requested} rules requested, host allows {max}")]
    QuotaExceeded {
        /// Rule count after the update
        requested: usize,
        /// Host limit
        max: usize,
    },

    /// Remote tracker directory could not be fetched or parsed
    #[error("Tracker directory fetch failed: {0}")]
    Fetch(String),

    /// Every probe slot for a short hash is taken by another URL
    #[error("No free short hash for '{url}' after {attempts} attempts")]
    HashSpaceExhausted {
        /// URL being shortened
        url: String,
        /// Number of probes tried
        attempts: u32,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is worth retrying on the next trigger
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Storage { .. } | Self::Io(_))
    }
}
