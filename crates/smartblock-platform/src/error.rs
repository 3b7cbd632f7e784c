//! Platform-specific errors

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Update would leave more rules than the table allows
    #[error("Rule table full: {requested} rules requested, limit is {max}")]
    QuotaExceeded {
        /// Rule count after the update
        requested: usize,
        /// Table limit
        max: usize,
    },

    /// Two rules in the resulting table share an id
    #[error("Duplicate rule id {0}")]
    DuplicateId(u32),

    /// A rule failed validation
    #[error("Invalid rule {id}: {reason}")]
    InvalidRule {
        /// Offending rule id
        id: u32,
        /// Why it was rejected
        reason: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with something unusable
    #[error("Unexpected response from {url}: {message}")]
    BadResponse {
        /// Requested URL
        url: String,
        /// What was wrong
        message: String,
    },

    /// Persisted file is unreadable
    #[error("Corrupt data file {path}: {message}")]
    Corrupt {
        /// File path
        path: String,
        /// Parse error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

impl From<PlatformError> for smartblock_core::Error {
    fn from(err: PlatformError) -> Self {
        use smartblock_core::Error as CoreError;

        match err {
            PlatformError::QuotaExceeded { requested, max } => CoreError::QuotaExceeded { requested, max },
            PlatformError::DuplicateId(_) | PlatformError::InvalidRule { .. } => CoreError::Host(err.to_string()),
            PlatformError::Http(_) | PlatformError::BadResponse { .. } => CoreError::Fetch(err.to_string()),
            PlatformError::Corrupt { path, message } => CoreError::Storage { key: path, message },
            PlatformError::Io(e) => CoreError::Io(e),
            PlatformError::Json(e) => CoreError::Json(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartblock_core::Error as CoreError;

    #[test]
    fn test_conversion_to_core() {
        let core: CoreError = PlatformError::QuotaExceeded { requested: 6, max: 5 }.into();
        assert!(matches!(core, CoreError::QuotaExceeded { requested: 6, max: 5 }));

        let core: CoreError = PlatformError::DuplicateId(7).into();
        assert!(matches!(core, CoreError::Host(ref m) if m.contains('7')));

        let core: CoreError = PlatformError::BadResponse {
            url: "https://x.test".into(),
            message: "no trackers".into(),
        }
        .into();
        assert!(matches!(core, CoreError::Fetch(_)));
    }
}
