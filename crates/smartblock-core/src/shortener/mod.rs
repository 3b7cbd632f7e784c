//! Local URL shortener
//!
//! Short links are hash-keyed records in local storage. A hash is the hex
//! form of the rolling string hash of the URL; when the slot is held by a
//! different live URL, the URL is rehashed with an attempt counter until a
//! free slot turns up.

mod safety;

pub use safety::{assess_url, is_suspicious_url, Suspicion};

use crate::config::ShortenerConfig;
use crate::error::{Error, Result};
use crate::host::Clock;
use crate::rules::rolling_hash32;
use crate::storage::{keys, Area, Storage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

const MILLIS_PER_DAY: u64 = 86_400_000;

/// A stored short link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    /// Destination
    pub original_url: String,
    /// Creation time, epoch ms
    pub created: u64,
    /// Expiry time, epoch ms; 0 never expires
    pub expires: u64,
    /// Successful resolutions
    pub use_count: u64,
}

impl UrlRecord {
    /// Whether the record is past its expiry at `now`
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && now > self.expires
    }
}

/// Short hash to record
pub type UrlMappings = BTreeMap<String, UrlRecord>;

/// Shortener counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortenerStats {
    /// Links created
    pub urls_shortened: u64,
    /// Links resolved
    pub urls_accessed: u64,
    /// Sum of original minus short length; negative when links got longer
    pub characters_reduced: i64,
}

/// Result of a shorten call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrl {
    /// Storage key
    pub hash: String,
    /// Full short link
    pub short_url: String,
    /// An existing live link for the same URL was returned
    pub reused: bool,
}

/// Hash-keyed short link store
pub struct UrlShortener {
    storage: Storage,
    clock: Arc<dyn Clock>,
    config: ShortenerConfig,
    write_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for UrlShortener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlShortener")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UrlShortener {
    /// Create a shortener over `storage`
    pub fn new(storage: Storage, clock: Arc<dyn Clock>, config: ShortenerConfig) -> Self {
        Self {
            storage,
            clock,
            config,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Short link for a hash
    pub fn short_url_for(&self, hash: &str) -> String {
        format!("{}/{hash}", self.config.base_url.trim_end_matches('/'))
    }

    /// Hash probed on `attempt` for `url`
    pub fn hash_candidate(url: &str, attempt: u32, length: usize) -> String {
        let hash = if attempt == 0 {
            rolling_hash32(url)
        } else {
            rolling_hash32(&format!("{url}#{attempt}"))
        };
        let mut encoded = hex::encode(hash.to_be_bytes());
        encoded.truncate(length);
        encoded
    }

    /// Create (or reuse) a short link for `url`
    ///
    /// `expiration_days` falls back to the configured default; 0 never
    /// expires.
    #[instrument(skip(self))]
    pub async fn shorten(&self, url: &str, expiration_days: Option<u32>) -> Result<ShortUrl> {
        validate_url(url)?;
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now_millis();
        let mut mappings = self.mappings().await?;

        let mut slot = None;
        for attempt in 0..self.config.max_probes {
            let hash = Self::hash_candidate(url, attempt, self.config.hash_length);
            match mappings.get(&hash) {
                Some(record) if record.original_url == url && !record.is_expired(now) => {
                    debug!(%hash, "Reusing existing short link");
                    return Ok(ShortUrl {
                        short_url: self.short_url_for(&hash),
                        hash,
                        reused: true,
                    });
                }
                Some(record) if !record.is_expired(now) => {
                    debug!(%hash, attempt, "Short hash taken; probing");
                }
                _ => {
                    slot = Some(hash);
                    break;
                }
            }
        }

        let hash = slot.ok_or_else(|| Error::HashSpaceExhausted {
            url: url.to_string(),
            attempts: self.config.max_probes,
        })?;

        let days = expiration_days.unwrap_or(self.config.default_expiration_days);
        let expires = if days == 0 {
            0
        } else {
            now.saturating_add(u64::from(days) * MILLIS_PER_DAY)
        };

        mappings.insert(
            hash.clone(),
            UrlRecord {
                original_url: url.to_string(),
                created: now,
                expires,
                use_count: 0,
            },
        );
        self.storage.write(Area::Local, keys::URL_MAPPINGS, &mappings).await?;

        let short_url = self.short_url_for(&hash);
        let mut stats = self.stats().await;
        stats.urls_shortened += 1;
        stats.characters_reduced += char_len(url) - char_len(&short_url);
        self.storage.write(Area::Local, keys::SHORTENER_STATS, &stats).await?;

        info!(%hash, expires, "Shortened URL");
        Ok(ShortUrl {
            hash,
            short_url,
            reused: false,
        })
    }

    /// Destination for `hash`, or `None` if unknown or expired
    ///
    /// Expired records are deleted on the way out.
    #[instrument(skip(self))]
    pub async fn resolve(&self, hash: &str) -> Result<Option<String>> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now_millis();
        let mut mappings = self.mappings().await?;

        let Some(record) = mappings.get_mut(hash) else {
            return Ok(None);
        };

        if record.is_expired(now) {
            mappings.remove(hash);
            self.storage.write(Area::Local, keys::URL_MAPPINGS, &mappings).await?;
            debug!(hash, "Removed expired short link");
            return Ok(None);
        }

        record.use_count += 1;
        let original = record.original_url.clone();
        self.storage.write(Area::Local, keys::URL_MAPPINGS, &mappings).await?;

        let mut stats = self.stats().await;
        stats.urls_accessed += 1;
        self.storage.write(Area::Local, keys::SHORTENER_STATS, &stats).await?;

        Ok(Some(original))
    }

    /// Every stored record, expired ones included
    pub async fn all_urls(&self) -> Result<UrlMappings> {
        self.mappings().await
    }

    /// Delete one record; `false` if it did not exist
    pub async fn delete_url(&self, hash: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut mappings = self.mappings().await?;
        if mappings.remove(hash).is_none() {
            return Ok(false);
        }
        self.storage.write(Area::Local, keys::URL_MAPPINGS, &mappings).await?;
        Ok(true)
    }

    /// Delete every record
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage
            .write(Area::Local, keys::URL_MAPPINGS, &UrlMappings::new())
            .await
    }

    /// Current counters
    pub async fn stats(&self) -> ShortenerStats {
        match self.storage.read(Area::Local, keys::SHORTENER_STATS).await {
            Ok(stats) => stats.unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Unreadable shortener stats; starting from zero");
                ShortenerStats::default()
            }
        }
    }

    /// Zero the counters
    pub async fn reset_stats(&self) -> Result<()> {
        self.storage
            .write(Area::Local, keys::SHORTENER_STATS, &ShortenerStats::default())
            .await
    }

    async fn mappings(&self) -> Result<UrlMappings> {
        Ok(self
            .storage
            .read(Area::Local, keys::URL_MAPPINGS)
            .await?
            .unwrap_or_default())
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        "http" | "https" => Err(Error::invalid_url(url, "URL has no host")),
        other => Err(Error::invalid_url(url, format!("unsupported scheme '{other}'"))),
    }
}

fn char_len(s: &str) -> i64 {
    i64::try_from(s.chars().count()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_candidate_shape() {
        let hash = UrlShortener::hash_candidate("https://example.com/", 0, 8);
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, UrlShortener::hash_candidate("https://example.com/", 0, 8));
        assert_ne!(hash, UrlShortener::hash_candidate("https://example.com/", 1, 8));
        assert_eq!(UrlShortener::hash_candidate("https://example.com/", 0, 6), hash[..6]);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/x").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(matches!(validate_url("ftp://example.com"), Err(Error::InvalidUrl { .. })));
        assert!(validate_url("example.com").is_err());
    }

    #[test]
    fn test_record_expiry() {
        let record = UrlRecord {
            original_url: "https://example.com".into(),
            created: 0,
            expires: 100,
            use_count: 0,
        };
        assert!(!record.is_expired(100));
        assert!(record.is_expired(101));

        let forever = UrlRecord { expires: 0, ..record };
        assert!(!forever.is_expired(u64::MAX));
    }
}
