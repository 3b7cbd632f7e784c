//! File-backed key-value store
//!
//! Each store is one JSON object on disk, rewritten in full on every
//! mutation. Reads are served from memory.

use crate::error::{PlatformError, Result};
use crate::fsutil::write_atomic;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use smartblock_core::storage::KeyValueStore;
use smartblock_core::Storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File name of the local storage area
pub const LOCAL_FILE: &str = "local.json";
/// File name of the synced storage area
pub const SYNC_FILE: &str = "sync.json";

/// [`KeyValueStore`] persisted as a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(PlatformError::Corrupt {
                        path: path.display().to_string(),
                        message: "top-level value is not an object".to_string(),
                    })
                }
                Err(e) => {
                    return Err(PlatformError::Corrupt {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate(&self, key: &str, change: impl FnOnce(&mut Map<String, Value>)) -> smartblock_core::Result<()> {
        let _write = self.write_lock.lock().await;

        let mut next = self.entries.read().clone();
        change(&mut next);
        let bytes = serde_json::to_vec_pretty(&next)?;

        write_atomic(&self.path, &bytes)
            .await
            .map_err(|e| smartblock_core::Error::storage(key, e.to_string()))?;
        *self.entries.write() = next;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> smartblock_core::Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> smartblock_core::Result<()> {
        self.mutate(key, |map| {
            map.insert(key.to_string(), value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> smartblock_core::Result<()> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        self.mutate(key, |map| {
            map.remove(key);
        })
        .await
    }

    async fn keys(&self) -> smartblock_core::Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// Storage with both areas persisted under `dir`
pub async fn open_storage(dir: impl AsRef<Path>) -> Result<Storage> {
    let dir = dir.as_ref();
    let local = JsonFileStore::open(dir.join(LOCAL_FILE)).await?;
    let sync = JsonFileStore::open(dir.join(SYNC_FILE)).await?;
    Ok(Storage::new(Arc::new(local), Arc::new(sync)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("stats", json!({ "totalBlocked": 3 })).await.unwrap();
        store.set("trackers", json!({})).await.unwrap();
        store.remove("trackers").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("stats").await.unwrap(), Some(json!({ "totalBlocked": 3 })));
        assert_eq!(reopened.keys().await.unwrap(), vec!["stats"]);
    }

    #[tokio::test]
    async fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
        store.remove("nothing").await.unwrap();

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "\n").unwrap();
        assert!(JsonFileStore::open(&blank).await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(JsonFileStore::open(&path).await, Err(PlatformError::Corrupt { .. })));

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(JsonFileStore::open(&path).await, Err(PlatformError::Corrupt { .. })));
    }
}
