//! Shared command context
//!
//! Locates the configuration and data directory, then wires the engine to
//! the file-backed host implementations.

use anyhow::{Context, Result};
use smartblock_core::host::{EmptyDirectory, RuleInstaller, TrackerDirectory};
use smartblock_core::{BlockerService, Collaborators, Config};
use smartblock_platform::{open_storage, DynamicRuleTable, HttpTrackerDirectory, LogNotifier, RULES_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::args::Args;

/// Config file names searched in the working directory
pub const CONFIG_CANDIDATES: &[&str] = &["smartblock.toml", "config.toml"];

/// Project directories for this application
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "smartblock")
}

/// First existing config file among the search paths
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_CANDIDATES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }

    let path = project_dirs()?.config_dir().join("config.toml");
    path.exists().then_some(path)
}

/// Load the config named on the command line, a discovered one, or defaults
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::default(),
    };

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Data directory: flag, then config, then the platform data dir
pub fn data_dir(args: &Args, config: &Config) -> PathBuf {
    args.data_dir
        .clone()
        .or_else(|| config.general.data_dir.clone())
        .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
        .unwrap_or_else(|| config.data_dir())
}

/// Engine plus the concrete rule table behind it
pub struct AppContext {
    /// Wired service
    pub service: Arc<BlockerService>,
    /// Installed rule table
    pub table: Arc<DynamicRuleTable>,
    /// Where state lives
    pub data_dir: PathBuf,
}

impl AppContext {
    /// Open persistent state and build the service
    pub async fn open(args: &Args, config: Config) -> Result<Self> {
        let data_dir = data_dir(args, &config);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let table = Arc::new(
            DynamicRuleTable::open(data_dir.join(RULES_FILE), config.host.max_rules)
                .await
                .context("Failed to open rule table")?,
        );
        let storage = open_storage(&data_dir).await.context("Failed to open storage")?;

        let directory: Arc<dyn TrackerDirectory> = if args.offline {
            Arc::new(EmptyDirectory)
        } else {
            Arc::new(HttpTrackerDirectory::from_config(&config.updates).context("Failed to build HTTP client")?)
        };

        let installer: Arc<dyn RuleInstaller> = Arc::clone(&table) as Arc<dyn RuleInstaller>;
        let collaborators = Collaborators::new(installer, directory).with_notifier(Arc::new(LogNotifier));
        let service = Arc::new(BlockerService::new(config, storage, collaborators));

        debug!(data_dir = %data_dir.display(), "Context ready");
        Ok(Self {
            service,
            table,
            data_dir,
        })
    }

    /// Open and run [`BlockerService::prepare`]
    pub async fn prepared(args: &Args, config: Config) -> Result<Self> {
        let ctx = Self::open(args, config).await?;
        ctx.service.prepare().await.context("Failed to prepare storage")?;
        Ok(ctx)
    }

    /// Flush in-memory state before the process exits
    pub async fn finish(&self) {
        self.service.on_suspend().await;
    }
}
