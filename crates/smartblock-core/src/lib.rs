//! # SmartBlock Core
//!
//! Host-independent engine for ad and tracker blocking.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Rule compilation** - Domains and allow patterns to dynamic block rules
//! - **Reconciliation** - Minimal, idempotent updates against the installed snapshot
//! - **Tracker accounting** - Detection tally, savings estimate, debounced page observer
//! - **URL shortener** - Hash-keyed local short links
//! - **Service** - One context object wiring storage, host collaborators and triggers
//!
//! ## Example
//!
//! ```rust,no_run
//! use smartblock_core::{BlockerService, Collaborators, Config, Storage};
//! use smartblock_core::host::EmptyDirectory;
//! use std::sync::Arc;
//!
//! # async fn demo(installer: Arc<dyn smartblock_core::host::RuleInstaller>) -> smartblock_core::Result<()> {
//! let config = Config::load("smartblock.toml")?;
//! let service = BlockerService::new(
//!     config,
//!     Storage::in_memory(),
//!     Collaborators::new(installer, Arc::new(EmptyDirectory)),
//! );
//!
//! service.initialize().await?;
//! service.refresh_rules().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blocklist;
pub mod config;
pub mod error;
pub mod host;
pub mod messages;
pub mod reconcile;
pub mod rules;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod shortener;
pub mod storage;
pub mod tracker;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use messages::{Request, Response};
pub use reconcile::{Decision, DiffStrategy, ReconcileOutcome, Reconciler};
pub use rules::{Rule, RuleCompiler};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use service::{BlockerService, Collaborators, InstallReason, RefreshOutcome};
pub use settings::UserSettings;
pub use storage::{KeyValueStore, Storage};
