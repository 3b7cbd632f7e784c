//! Background service
//!
//! [`BlockerService`] is the single context object holding every piece of
//! engine state: settings access, the installed-rule snapshot, the savings
//! estimate, and the shortener. Triggers (startup, timers, requests,
//! settings edits) all go through it.

use crate::blocklist::{merge_domains, static_domains};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{Clock, Notifier, RuleInstaller, SystemClock, TrackerDirectory};
use crate::messages::{Request, Response};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::rules::{Rule, RuleCompiler};
use crate::settings::UserSettings;
use crate::shortener::{UrlMappings, UrlShortener};
use crate::storage::Storage;
use crate::tracker::observer::{ReportSink, SendError, TrackerReport};
use crate::tracker::PerformanceTracker;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Host-side collaborators of the service
#[derive(Clone)]
pub struct Collaborators {
    /// Dynamic rule table
    pub installer: Arc<dyn RuleInstaller>,
    /// Remote tracker list
    pub directory: Arc<dyn TrackerDirectory>,
    /// User notifications
    pub notifier: Arc<dyn Notifier>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators with the given installer and directory, a silent
    /// notifier and the system clock
    pub fn new(installer: Arc<dyn RuleInstaller>, directory: Arc<dyn TrackerDirectory>) -> Self {
        Self {
            installer,
            directory,
            notifier: Arc::new(crate::host::SilentNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Why the extension lifecycle fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    /// First install
    Install,
    /// Extension update
    Update,
    /// Browser update
    BrowserUpdate,
}

/// Result of a rule refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Blocking is switched off; installed rules were left alone
    Paused,
    /// Rules were compiled and reconciled
    Reconciled {
        /// Domains compiled
        domains: usize,
        /// Domains that came from the remote directory
        dynamic: usize,
        /// What the reconciler did
        outcome: ReconcileOutcome,
    },
}

/// Engine context object
pub struct BlockerService {
    config: Config,
    storage: Storage,
    compiler: RuleCompiler,
    reconciler: Reconciler,
    performance: PerformanceTracker,
    shortener: UrlShortener,
    installer: Arc<dyn RuleInstaller>,
    directory: Arc<dyn TrackerDirectory>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for BlockerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockerService")
            .field("installed_rules", &self.reconciler.snapshot().len())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl BlockerService {
    /// Wire up a service
    pub fn new(config: Config, storage: Storage, collaborators: Collaborators) -> Self {
        let compiler = RuleCompiler::new(config.blocking.resource_types);
        let reconciler = Reconciler::new(config.reconcile.diff, config.reconcile.single_flight);
        let performance = PerformanceTracker::new(
            storage.clone(),
            Arc::clone(&collaborators.notifier),
            config.trackers.clone(),
        );
        let shortener = UrlShortener::new(
            storage.clone(),
            Arc::clone(&collaborators.clock),
            config.shortener.clone(),
        );

        Self {
            config,
            storage,
            compiler,
            reconciler,
            performance,
            shortener,
            installer: collaborators.installer,
            directory: collaborators.directory,
            initialized: AtomicBool::new(false),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Storage repository
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Snapshot owner
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Savings estimate and tally
    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    /// Short link store
    pub fn shortener(&self) -> &UrlShortener {
        &self.shortener
    }

    /// Whether [`Self::initialize`] has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // =========== Lifecycle ===========

    /// Bring storage, stats and rules up; runs once
    ///
    /// Any failure falls back to installing the static list so blocking
    /// keeps working with degraded coverage.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        match self.try_initialize().await {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                info!(rules = self.reconciler.snapshot().len(), "Service initialized");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Initialization failed; falling back to static list");
                self.install_static_rules().await.map(|_| ())
            }
        }
    }

    async fn try_initialize(&self) -> Result<()> {
        self.prepare().await?;
        self.refresh_rules().await?;
        Ok(())
    }

    /// Seed storage, the installed-rule snapshot and the in-memory stats
    ///
    /// Everything [`Self::initialize`] does short of refreshing rules; for
    /// callers that run a single operation against existing state.
    ///
    /// The snapshot is seeded before storage is touched; a storage error
    /// is returned only after seeding and stats loading have run.
    pub async fn prepare(&self) -> Result<()> {
        match self.installer.installed_rules().await {
            Ok(existing) => {
                debug!(rules = existing.len(), "Seeding snapshot from host");
                self.reconciler.seed(existing);
            }
            Err(e) => warn!(error = %e, "Could not read installed rules; starting from empty snapshot"),
        }

        let storage = self.storage.initialize().await;
        self.performance.load().await;
        storage
    }

    /// Install or update hook
    pub async fn on_installed(&self, reason: InstallReason) -> Result<()> {
        info!(?reason, "Extension installed");
        if reason == InstallReason::Install {
            self.storage.reset_tracker_tally().await?;
            self.performance.reset().await?;
        }
        self.initialize().await
    }

    /// Persist state before going idle
    pub async fn on_suspend(&self) {
        debug!("Service suspending");
        self.save_stats().await;
    }

    /// Persist the savings estimate, logging failures
    pub async fn save_stats(&self) {
        if let Err(e) = self.performance.save().await {
            error!(error = %e, "Error saving performance stats");
        }
    }

    // =========== Rules ===========

    /// Blocked domains for the given settings
    ///
    /// The static list comes first, then configured extras, then the remote
    /// directory when auto-update is on. A failed fetch contributes nothing.
    pub async fn assemble_domains(&self, settings: &UserSettings) -> (Vec<String>, usize) {
        let fixed = static_domains();
        let extra = &self.config.blocking.extra_domains;

        let dynamic = if settings.auto_update_lists {
            match self.directory.fetch_domains().await {
                Ok(domains) => {
                    info!(count = domains.len(), "Fetched trackers from dynamic source");
                    domains
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch dynamic lists");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let merged = merge_domains(&[&fixed[..], &extra[..], &dynamic[..]]);
        let dynamic_count = merged.len().saturating_sub(merge_domains(&[&fixed[..], &extra[..]]).len());
        (merged, dynamic_count)
    }

    /// Candidate rule set for the current settings and allow-list
    pub async fn candidate_rules(&self) -> Vec<Rule> {
        let settings = self.storage.load_settings().await;
        let (domains, _) = self.assemble_domains(&settings).await;
        let patterns = self.storage.allowed_sites().await;
        self.compiler.compile(&domains, &patterns)
    }

    /// Rebuild the block list and reconcile it with the host
    #[instrument(skip(self))]
    pub async fn refresh_rules(&self) -> Result<RefreshOutcome> {
        let settings = self.storage.load_settings().await;
        if !settings.blocking_enabled {
            info!("Ad blocking disabled in settings");
            return Ok(RefreshOutcome::Paused);
        }

        let (domains, dynamic) = self.assemble_domains(&settings).await;
        self.apply(domains, dynamic).await
    }

    /// Reconcile the static list alone
    pub async fn install_static_rules(&self) -> Result<RefreshOutcome> {
        let settings = self.storage.load_settings().await;
        if !settings.blocking_enabled {
            return Ok(RefreshOutcome::Paused);
        }
        self.apply(static_domains(), 0).await
    }

    async fn apply(&self, domains: Vec<String>, dynamic: usize) -> Result<RefreshOutcome> {
        let patterns = self.storage.allowed_sites().await;
        let candidate = self.compiler.compile(&domains, &patterns);

        let max = self.config.host.max_rules;
        if candidate.len() > max {
            return Err(Error::QuotaExceeded {
                requested: candidate.len(),
                max,
            });
        }

        let outcome = self.reconciler.reconcile(candidate, self.installer.as_ref()).await?;
        Ok(RefreshOutcome::Reconciled {
            domains: domains.len(),
            dynamic,
            outcome,
        })
    }

    // =========== Settings and allow-list ===========

    /// Persist settings and re-run reconciliation
    pub async fn update_settings(&self, settings: &UserSettings) -> Result<RefreshOutcome> {
        self.storage.save_settings(settings).await?;
        self.refresh_rules().await
    }

    /// Allow `url`'s host and re-run reconciliation
    pub async fn allow_url(&self, url: &str) -> Result<bool> {
        let added = self.storage.allow_url(url).await?;
        if added {
            self.refresh_rules().await?;
        }
        Ok(added)
    }

    /// Stop allowing `url`'s host and re-run reconciliation
    pub async fn disallow_url(&self, url: &str) -> Result<bool> {
        let removed = self.storage.disallow_url(url).await?;
        if removed {
            self.refresh_rules().await?;
        }
        Ok(removed)
    }

    // =========== Requests ===========

    /// Answer one protocol request
    ///
    /// Never fails at the transport level; errors are folded into the
    /// response the request type expects.
    #[instrument(skip(self, request), fields(kind = request.kind()))]
    pub async fn handle(&self, request: Request) -> Response {
        debug!("Message received");
        match request {
            Request::RefreshRules => match self.refresh_rules().await {
                Ok(_) => Response::ok(),
                Err(e) => Response::failure(e),
            },
            Request::TrackerDetected { hostname, .. } => {
                if hostname.is_empty() {
                    return Response::failure("missing hostname");
                }
                let settings = self.storage.load_settings().await;
                match self.performance.record_detection(&hostname, &settings).await {
                    Ok(_) => Response::ok(),
                    Err(e) => {
                        error!(error = %e, "Error handling tracker detection");
                        Response::failure(e)
                    }
                }
            }
            Request::GetPerformanceStats => Response::PerformanceStats(self.performance.stats()),
            Request::ResetStats => match self.performance.reset().await {
                Ok(()) => Response::ok(),
                Err(e) => Response::failure(e),
            },
            Request::ShortenUrl { url, expiration_days } => {
                match self.shortener.shorten(&url, expiration_days).await {
                    Ok(short) => Response::ShortUrl {
                        success: true,
                        short_url: short.short_url,
                    },
                    Err(e) => Response::failure(e),
                }
            }
            Request::ResolveShortUrl { hash } => {
                Response::ResolvedUrl(self.shortener.resolve(&hash).await.unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to resolve short URL");
                    None
                }))
            }
            Request::GetRecentUrls => {
                Response::UrlMappings(self.shortener.all_urls().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read short URLs");
                    UrlMappings::new()
                }))
            }
            Request::DeleteUrl { hash } => {
                Response::Deleted(self.shortener.delete_url(&hash).await.unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to delete short URL");
                    false
                }))
            }
            Request::ClearUrlHistory => match self.shortener.clear().await {
                Ok(()) => Response::ok(),
                Err(e) => Response::failure(e),
            },
            Request::GetShortenerStats => Response::ShortenerStats(self.shortener.stats().await),
            Request::ResetShortenerStats => match self.shortener.reset_stats().await {
                Ok(()) => Response::ok(),
                Err(e) => Response::failure(e),
            },
        }
    }
}

#[async_trait]
impl ReportSink for BlockerService {
    async fn report(&self, report: TrackerReport) -> std::result::Result<(), SendError> {
        let response = self.handle(Request::from(report)).await;
        if response.is_success() {
            Ok(())
        } else {
            Err(SendError::Failed(format!("{response:?}")))
        }
    }
}
