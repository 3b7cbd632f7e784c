//! Remote tracker directory
//!
//! Fetches the public tracker database and extracts tracker domains. The
//! document is a JSON object whose `trackers` member is keyed by domain.

use crate::error::{PlatformError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use smartblock_core::config::UpdatesConfig;
use smartblock_core::host::TrackerDirectory;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// User agent sent with directory requests
pub const USER_AGENT: &str = concat!("SmartBlock/", env!("CARGO_PKG_VERSION"));

/// HTTP-backed [`TrackerDirectory`]
#[derive(Debug, Clone)]
pub struct HttpTrackerDirectory {
    client: Client,
    url: Url,
}

impl HttpTrackerDirectory {
    /// Directory at `url` with a per-request timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| PlatformError::BadResponse {
            url: url.to_string(),
            message: format!("invalid endpoint: {e}"),
        })?;
        let client = Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Directory configured from the updates section
    pub fn from_config(updates: &UpdatesConfig) -> Result<Self> {
        Self::new(&updates.directory_url, updates.fetch_timeout())
    }

    /// Endpoint
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and parse the directory
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.url.clone()).send().await?.error_for_status()?;
        let document: Value = response.json().await?;
        let domains = parse_directory(&document).map_err(|message| PlatformError::BadResponse {
            url: self.url.to_string(),
            message,
        })?;
        debug!(count = domains.len(), "Tracker directory fetched");
        Ok(domains)
    }
}

#[async_trait]
impl TrackerDirectory for HttpTrackerDirectory {
    async fn fetch_domains(&self) -> smartblock_core::Result<Vec<String>> {
        self.fetch().await.map_err(Into::into)
    }
}

/// Tracker domains listed in a directory document
pub fn parse_directory(document: &Value) -> std::result::Result<Vec<String>, String> {
    let trackers = document
        .get("trackers")
        .ok_or_else(|| "missing 'trackers' member".to_string())?
        .as_object()
        .ok_or_else(|| "'trackers' is not an object".to_string())?;

    Ok(trackers
        .keys()
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect())
}
