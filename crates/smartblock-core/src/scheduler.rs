//! Periodic alarms
//!
//! Drives the two recurring jobs (rule refresh and stats flush) and accepts
//! forced refreshes from the outside. Jobs from different triggers are not
//! serialized against each other unless the reconciler was built with
//! single-flight enabled.

use crate::config::{UpdatesConfig, MAX_INTERVAL_MINUTES};
use crate::service::BlockerService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Named recurring jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// Rebuild and reconcile rules
    UpdateRules,
    /// Persist the savings estimate
    SaveStats,
}

impl Alarm {
    /// Alarm name
    pub fn name(self) -> &'static str {
        match self {
            Self::UpdateRules => "updateRules",
            Self::SaveStats => "saveStats",
        }
    }
}

/// Run one alarm against the service
pub async fn run_alarm(service: &BlockerService, alarm: Alarm) {
    debug!(alarm = alarm.name(), "Alarm fired");
    match alarm {
        Alarm::UpdateRules => {
            info!("Running scheduled rules update");
            if let Err(e) = service.refresh_rules().await {
                error!(error = %e, "Scheduled rules update failed");
            }
        }
        Alarm::SaveStats => service.save_stats().await,
    }
}

/// Alarm loop configuration
#[derive(Debug)]
pub struct Scheduler {
    service: Arc<BlockerService>,
    update_every: Duration,
    stats_every: Duration,
}

/// Control handle for a running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    refresh_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Scheduler using the configured periods
    pub fn new(service: Arc<BlockerService>, updates: &UpdatesConfig) -> Self {
        Self::with_periods(service, updates.update_interval(), updates.stats_interval())
    }

    /// Scheduler with explicit periods
    ///
    /// Periods are clamped to between one second and
    /// [`MAX_INTERVAL_MINUTES`].
    pub fn with_periods(service: Arc<BlockerService>, update_every: Duration, stats_every: Duration) -> Self {
        Self {
            service,
            update_every: clamp_period(update_every),
            stats_every: clamp_period(stats_every),
        }
    }

    /// Effective rule refresh period
    pub fn update_every(&self) -> Duration {
        self.update_every
    }

    /// Effective stats flush period
    pub fn stats_every(&self) -> Duration {
        self.stats_every
    }

    /// Start the loop on the current runtime
    ///
    /// The first tick of each alarm fires one full period after start.
    pub fn spawn(self) -> SchedulerHandle {
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(8);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut rules = interval_at(start + self.update_every, self.update_every);
            let mut stats = interval_at(start + self.stats_every, self.stats_every);
            rules.set_missed_tick_behavior(MissedTickBehavior::Delay);
            stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                update_minutes = self.update_every.as_secs() / 60,
                stats_minutes = self.stats_every.as_secs() / 60,
                "Scheduler started"
            );

            loop {
                tokio::select! {
                    _ = rules.tick() => run_alarm(&self.service, Alarm::UpdateRules).await,
                    _ = stats.tick() => run_alarm(&self.service, Alarm::SaveStats).await,
                    Some(()) = refresh_rx.recv() => {
                        info!("Forced refresh requested");
                        run_alarm(&self.service, Alarm::UpdateRules).await;
                        rules.reset();
                    }
                    _ = shutdown_rx.changed() => {
                        self.service.on_suspend().await;
                        break;
                    }
                }
            }

            info!("Scheduler stopped");
        });

        SchedulerHandle {
            refresh_tx,
            shutdown_tx,
            task,
        }
    }
}

impl SchedulerHandle {
    /// Ask for an immediate rule refresh; `false` if the loop is gone
    pub async fn request_refresh(&self) -> bool {
        self.refresh_tx.send(()).await.is_ok()
    }

    /// Stop the loop, flushing stats on the way out
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

fn clamp_period(period: Duration) -> Duration {
    period.clamp(Duration::from_secs(1), Duration::from_secs(MAX_INTERVAL_MINUTES * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::{MockRuleInstaller, MockTrackerDirectory};
    use crate::messages::Request;
    use crate::service::Collaborators;
    use crate::storage::Storage;

    #[test]
    fn test_alarm_names() {
        assert_eq!(Alarm::UpdateRules.name(), "updateRules");
        assert_eq!(Alarm::SaveStats.name(), "saveStats");
    }

    #[tokio::test]
    async fn test_periods_are_clamped() {
        let service = Arc::new(BlockerService::new(
            Config::default(),
            Storage::in_memory(),
            Collaborators::new(Arc::new(MockRuleInstaller::new()), Arc::new(MockTrackerDirectory::new())),
        ));

        let scheduler = Scheduler::with_periods(service, Duration::MAX, Duration::ZERO);
        assert_eq!(scheduler.update_every(), Duration::from_secs(MAX_INTERVAL_MINUTES * 60));
        assert_eq!(scheduler.stats_every(), Duration::from_secs(1));

        // the loop starts even with the longest period
        scheduler.spawn().shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_alarm_persists() {
        let storage = Storage::in_memory();
        let mut directory = MockTrackerDirectory::new();
        directory.expect_fetch_domains().returning(|| Ok(Vec::new()));
        let mut installer = MockRuleInstaller::new();
        installer.expect_update_dynamic_rules().returning(|_, _| Ok(()));

        let service = Arc::new(BlockerService::new(
            Config::default(),
            storage.clone(),
            Collaborators::new(Arc::new(installer), Arc::new(directory)),
        ));
        service
            .handle(Request::TrackerDetected {
                hostname: "criteo.com".into(),
                url: None,
                timestamp: None,
            })
            .await;
        assert_eq!(storage.performance_stats().await.total_blocked, 0);

        let handle = Scheduler::with_periods(
            Arc::clone(&service),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        )
        .spawn();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(storage.performance_stats().await.total_blocked, 1);

        assert!(handle.request_refresh().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(service.reconciler().snapshot().len(), 10);

        handle.shutdown().await;
    }
}
