//! Two-tier (memory + per-pair file) time-range cache for hourly series.
//!
//! Disk is the durable tier: one `price_history_{FROM}_{TO}.json` document
//! per pair holding the series and its validity window. Memory is loaded
//! lazily and explicitly via [`PriceHistoryCache::ensure_loaded`] so cache
//! state stays inspectable. There is no eviction: published price history is
//! immutable and series only ever extend.

use crate::domain::history::PriceHistoryData;
use crate::shared::{PairCacheKey, Timestamp};

use async_lock::Mutex;
use async_lock::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FILE_PREFIX: &str = "price_history_";

/// File-backed cache of hourly price series, keyed by asset pair.
pub struct PriceHistoryCache {
    data_dir: PathBuf,
    /// In-memory tier. Guarded for concurrent resolution requests.
    entries: RwLock<HashMap<PairCacheKey, PriceHistoryData>>,
    /// Files discovered at startup or written since; the lazy-load index.
    known_files: RwLock<HashMap<PairCacheKey, PathBuf>>,
    /// Per-key guards so concurrent resolutions of one pair cannot run
    /// duplicate backfills. Unrelated pairs proceed independently.
    fetch_locks: Mutex<HashMap<PairCacheKey, Arc<Mutex<()>>>>,
}

impl PriceHistoryCache {
    /// Open a cache rooted at `data_dir`, creating the directory if needed
    /// and indexing any pre-existing cache files (without parsing them yet).
    pub fn open(data_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut known_files = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if let Some(key) = cache_key_from_path(&path) {
                known_files.insert(key, path);
            }
        }

        Ok(Self {
            data_dir,
            entries: RwLock::new(HashMap::new()),
            known_files: RwLock::new(known_files),
            fetch_locks: Mutex::new(HashMap::new()),
        })
    }

    fn file_path(&self, key: &PairCacheKey) -> PathBuf {
        self.data_dir.join(format!("{FILE_PREFIX}{key}.json"))
    }

    /// The mutual-exclusion boundary for check-then-fetch-then-store on one
    /// key. Callers hold the returned lock across the whole sequence.
    pub async fn fetch_lock(&self, key: &PairCacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.fetch_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    /// Load the on-disk series for `key` into memory if it exists and is not
    /// loaded yet. A missing, unreadable or malformed file is a cache miss,
    /// never an error.
    pub async fn ensure_loaded(&self, key: &PairCacheKey) {
        if self.entries.read().await.contains_key(key) {
            return;
        }
        let path = match self.known_files.read().await.get(key) {
            Some(path) => path.clone(),
            None => return,
        };
        let parsed: Option<PriceHistoryData> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok());
        match parsed {
            Some(data) => {
                tracing::debug!(key = %key, path = %path.display(), "loaded price history cache file");
                self.entries.write().await.insert(key.clone(), data);
            }
            None => {
                tracing::debug!(
                    key = %key,
                    path = %path.display(),
                    "ignoring unreadable price history cache file"
                );
            }
        }
    }

    /// Snapshot of the cached series for `key` if its validity window
    /// contains `timestamp`. Call [`Self::ensure_loaded`] first.
    pub async fn get_if_covers(
        &self,
        key: &PairCacheKey,
        timestamp: Timestamp,
    ) -> Option<PriceHistoryData> {
        let entries = self.entries.read().await;
        let data = entries.get(key)?;
        if data.covers(timestamp) {
            tracing::debug!(key = %key, timestamp, "found cached price history");
            Some(data.clone())
        } else {
            None
        }
    }

    /// Persist a freshly assembled series and publish it to the memory tier.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// a crash mid-write cannot leave a truncated file that parses as valid.
    pub async fn store(
        &self,
        key: &PairCacheKey,
        data: PriceHistoryData,
    ) -> std::io::Result<()> {
        let path = self.file_path(key);
        tracing::info!(key = %key, path = %path.display(), "updating price history cache");

        let serialized = serde_json::to_string(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &path)?;

        self.known_files.write().await.insert(key.clone(), path);
        self.entries.write().await.insert(key.clone(), data);
        Ok(())
    }
}

fn cache_key_from_path(path: &Path) -> Option<PairCacheKey> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(".json")?;
    if stem.is_empty() {
        return None;
    }
    Some(PairCacheKey::from(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::PriceHistoryEntry;
    use rust_decimal::Decimal;

    fn sample_series() -> PriceHistoryData {
        PriceHistoryData {
            data: vec![
                PriceHistoryEntry {
                    time: 3600,
                    low: Decimal::new(95, 1),
                    high: Decimal::new(105, 1),
                },
                PriceHistoryEntry {
                    time: 7200,
                    low: Decimal::new(99, 1),
                    high: Decimal::new(101, 1),
                },
            ],
            start_time: 3600,
            end_time: 10800,
        }
    }

    #[tokio::test]
    async fn test_store_then_reload_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let key = PairCacheKey::from("ETH_EUR");
        let series = sample_series();

        {
            let cache = PriceHistoryCache::open(dir.path()).unwrap();
            cache.store(&key, series.clone()).await.unwrap();
        }

        // A fresh instance must find the file in its startup scan and load
        // an identical series.
        let cache = PriceHistoryCache::open(dir.path()).unwrap();
        cache.ensure_loaded(&key).await;
        let loaded = cache.get_if_covers(&key, 5000).await.unwrap();
        assert_eq!(loaded, series);
    }

    #[tokio::test]
    async fn test_window_miss_outside_validity() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceHistoryCache::open(dir.path()).unwrap();
        let key = PairCacheKey::from("ETH_EUR");
        cache.store(&key, sample_series()).await.unwrap();

        assert!(cache.get_if_covers(&key, 3600).await.is_some());
        assert!(cache.get_if_covers(&key, 10799).await.is_some());
        assert!(cache.get_if_covers(&key, 10800).await.is_none());
        assert!(cache.get_if_covers(&key, 100).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("price_history_BAD_PAIR.json"), "{not json").unwrap();

        let cache = PriceHistoryCache::open(dir.path()).unwrap();
        let key = PairCacheKey::from("BAD_PAIR");
        cache.ensure_loaded(&key).await;
        assert!(cache.get_if_covers(&key, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceHistoryCache::open(dir.path()).unwrap();
        cache
            .store(&PairCacheKey::from("BTC_USD"), sample_series())
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["price_history_BTC_USD.json".to_string()]);
    }

    #[test]
    fn test_cache_key_from_path() {
        assert_eq!(
            cache_key_from_path(Path::new("/data/price_history_ETH_EUR.json")),
            Some(PairCacheKey::from("ETH_EUR"))
        );
        assert_eq!(cache_key_from_path(Path::new("/data/coinlist.json")), None);
        assert_eq!(
            cache_key_from_path(Path::new("/data/price_history_.json")),
            None
        );
    }
}
