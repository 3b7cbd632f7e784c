//! Host collaborator traits
//!
//! The engine never talks to a browser, a network or a clock directly.
//! These traits are the seams; `smartblock-platform` provides the real
//! implementations and tests substitute their own.

use crate::error::Result;
use crate::rules::Rule;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

/// Applies dynamic rule updates on the host
///
/// An update is all-or-nothing: when it returns `Err`, the host keeps the
/// rule set it had before the call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleInstaller: Send + Sync {
    /// Remove `remove_rule_ids` then add `add_rules`
    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<Rule>) -> Result<()>;

    /// Rules the host currently holds
    async fn installed_rules(&self) -> Result<Vec<Rule>>;
}

/// Remote source of additional tracker domains
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerDirectory: Send + Sync {
    /// Fetch the current domain list
    async fn fetch_domains(&self) -> Result<Vec<String>>;
}

/// User-facing notifications
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, title: &str, message: &str);
}

/// Wall clock in epoch milliseconds
pub trait Clock: Send + Sync {
    /// Current time
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Directory that never returns anything, for offline operation
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDirectory;

#[async_trait]
impl TrackerDirectory for EmptyDirectory {
    async fn fetch_domains(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Notifier that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now_millis();
        assert!(first > 0);
        assert!(clock.now_millis() >= first);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        assert!(EmptyDirectory.fetch_domains().await.unwrap().is_empty());
    }
}
