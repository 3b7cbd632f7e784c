//! Notifications surfaced through the log

use smartblock_core::host::Notifier;
use tracing::info;

/// [`Notifier`] that writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(target: "smartblock::notify", title, "{message}");
    }
}
