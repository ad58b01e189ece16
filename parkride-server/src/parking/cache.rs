//! Disk-backed store of parking detail records.
//!
//! Detail lookups against the parking directory are slow and throttled, so
//! fetched records are kept in a flat JSON object (parking id → record)
//! that survives restarts. The file is only read at `load` and only written
//! at `flush`; everything in between works on the in-memory map.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ParkingDetail;
use crate::providers::{ParkingDirectoryProvider, ProviderError, RetryPolicy};

/// Errors persisting the cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration for the detail cache.
#[derive(Debug, Clone)]
pub struct DetailCacheConfig {
    /// Path to the cache file.
    pub path: PathBuf,
}

impl DetailCacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for DetailCacheConfig {
    fn default() -> Self {
        Self::new("parking_details.json")
    }
}

/// Outcome of a bulk population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Records fetched and inserted.
    pub fetched: usize,
    /// Ids already present before the pass.
    pub skipped: usize,
    /// Ids whose fetch failed; left absent.
    pub failed: usize,
    /// True when the pass stopped on cancellation.
    pub interrupted: bool,
}

/// Parking id → detail record, persisted as JSON.
///
/// Readers take a short read lock on the map. Writes to disk are serialised
/// by a separate writer lock so two flushes never interleave.
#[derive(Debug)]
pub struct ParkingDetailCache {
    config: DetailCacheConfig,
    entries: RwLock<HashMap<String, ParkingDetail>>,
    writer: Mutex<()>,
}

impl ParkingDetailCache {
    /// Creates an empty cache that will persist to `config.path`.
    pub fn empty(config: DetailCacheConfig) -> Self {
        Self::with_entries(config, HashMap::new())
    }

    fn with_entries(config: DetailCacheConfig, entries: HashMap<String, ParkingDetail>) -> Self {
        Self {
            config,
            entries: RwLock::new(entries),
            writer: Mutex::new(()),
        }
    }

    /// Loads the cache file.
    ///
    /// Never fails: a missing or unreadable file gives an empty cache.
    pub fn load(config: DetailCacheConfig) -> Self {
        let contents = match std::fs::read_to_string(&config.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %config.path.display(), "no detail cache yet, starting empty");
                return Self::empty(config);
            }
            Err(e) => {
                warn!(path = %config.path.display(), error = %e, "failed to read detail cache");
                return Self::empty(config);
            }
        };

        match serde_json::from_str::<HashMap<String, ParkingDetail>>(&contents) {
            Ok(entries) => {
                info!(
                    path = %config.path.display(),
                    count = entries.len(),
                    "loaded parking detail cache"
                );
                Self::with_entries(config, entries)
            }
            Err(e) => {
                warn!(path = %config.path.display(), error = %e, "malformed detail cache, ignoring");
                Self::empty(config)
            }
        }
    }

    /// In-memory lookup. A miss is `None`.
    pub fn get(&self, id: &str) -> Option<ParkingDetail> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(id)
    }

    pub fn len(&self) -> usize {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds or replaces a record in memory.
    pub fn insert(&self, id: impl Into<String>, detail: ParkingDetail) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(id.into(), detail);
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Writes the whole mapping to disk.
    ///
    /// Keys are sorted. The file is written next to the target and renamed
    /// over it, so a crash mid-write leaves the previous file intact.
    /// Creates parent directories if they don't exist.
    pub fn flush(&self) -> Result<(), CacheError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: BTreeMap<String, ParkingDetail> = {
            let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            guard
                .iter()
                .map(|(id, detail)| (id.clone(), detail.clone()))
                .collect()
        };

        let path = &self.config.path;
        write_json(path, &snapshot)?;

        debug!(path = %path.display(), count = snapshot.len(), "flushed detail cache");
        Ok(())
    }

    /// Fetches one record from the directory and stores it in memory.
    pub async fn fetch_and_store<P>(
        &self,
        provider: &P,
        retry: &RetryPolicy,
        id: &str,
    ) -> Result<ParkingDetail, ProviderError>
    where
        P: ParkingDirectoryProvider,
    {
        let detail = retry.run("parking detail", || provider.detail(id)).await?;
        self.insert(id, detail.clone());
        Ok(detail)
    }

    /// Returns the cached record, fetching and storing it on a miss.
    pub async fn get_or_fetch<P>(
        &self,
        provider: &P,
        retry: &RetryPolicy,
        id: &str,
    ) -> Result<ParkingDetail, ProviderError>
    where
        P: ParkingDirectoryProvider,
    {
        match self.get(id) {
            Some(detail) => Ok(detail),
            None => self.fetch_and_store(provider, retry, id).await,
        }
    }

    /// Fetches every id not yet cached, one at a time.
    ///
    /// Failed ids are logged and left absent. If `cancel` completes first,
    /// the in-flight fetch is dropped and the pass stops. Either way the
    /// mapping is flushed before returning.
    pub async fn populate_all<P, I, C>(
        &self,
        provider: &P,
        retry: &RetryPolicy,
        ids: I,
        cancel: C,
    ) -> Result<PopulateReport, CacheError>
    where
        P: ParkingDirectoryProvider,
        I: IntoIterator,
        I::Item: AsRef<str>,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut report = PopulateReport::default();

        for id in ids {
            let id = id.as_ref();
            if self.contains(id) {
                report.skipped += 1;
                continue;
            }

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    info!(id, "population interrupted");
                    report.interrupted = true;
                    break;
                }
                result = self.fetch_and_store(provider, retry, id) => match result {
                    Ok(_) => {
                        debug!(id, "cached parking detail");
                        report.fetched += 1;
                    }
                    Err(e) => {
                        warn!(id, error = %e, "failed to fetch parking detail");
                        report.failed += 1;
                    }
                },
            }
        }

        self.flush()?;
        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            interrupted = report.interrupted,
            "detail cache population finished"
        );
        Ok(report)
    }
}

/// Writes `value` as pretty JSON via a temp file renamed over `path`,
/// creating parent directories as needed.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::tempdir;
    use tokio::sync::Notify;

    use crate::providers::mock::StubDirectory;

    fn detail(name: &str) -> ParkingDetail {
        ParkingDetail::new(name, format!("{name}straat 1"), "Den Haag")
    }

    fn stub_with(ids: &[&str]) -> StubDirectory {
        ids.iter()
            .fold(StubDirectory::new(), |stub, id| stub.with_detail(*id, detail(id)))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), 3)
    }

    #[test]
    fn persist_and_reload() {
        let dir = tempdir().unwrap();
        let config = DetailCacheConfig::new(dir.path().join("details.json"));

        let cache = ParkingDetailCache::empty(config.clone());
        cache.insert("A", detail("A"));
        cache.insert("B", detail("B"));
        cache.flush().unwrap();

        let reloaded = ParkingDetailCache::load(config);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("A"), Some(detail("A")));
        assert_eq!(reloaded.get("B"), Some(detail("B")));
        assert_eq!(reloaded.get("C"), None);
    }

    #[test]
    fn flush_sorts_keys_and_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("details.json");
        let cache = ParkingDetailCache::empty(DetailCacheConfig::new(&path));
        cache.insert("zz", detail("Z"));
        cache.insert("aa", detail("A"));
        cache.flush().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let aa = written.find("\"aa\"").unwrap();
        let zz = written.find("\"zz\"").unwrap();
        assert!(aa < zz);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn missing_or_malformed_file_loads_empty() {
        let dir = tempdir().unwrap();
        let missing = ParkingDetailCache::load(DetailCacheConfig::new(dir.path().join("nope.json")));
        assert!(missing.is_empty());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let broken = ParkingDetailCache::load(DetailCacheConfig::new(&path));
        assert!(broken.is_empty());
    }

    #[tokio::test]
    async fn get_or_fetch_only_fetches_misses() {
        let dir = tempdir().unwrap();
        let cache = ParkingDetailCache::empty(DetailCacheConfig::new(dir.path().join("d.json")));
        cache.insert("A", detail("A"));
        let stub = stub_with(&["B"]);

        let a = cache.get_or_fetch(&stub, &fast_retry(), "A").await.unwrap();
        let b = cache.get_or_fetch(&stub, &fast_retry(), "B").await.unwrap();

        assert_eq!(a, detail("A"));
        assert_eq!(b, detail("B"));
        assert_eq!(stub.detail_calls(), vec!["B"]);
        assert!(cache.contains("B"));
    }

    #[tokio::test]
    async fn interrupted_population_keeps_completed_entries() {
        let dir = tempdir().unwrap();
        let config = DetailCacheConfig::new(dir.path().join("details.json"));
        let ids = ["A", "B", "C"];

        let signal = Arc::new(Notify::new());
        let stalling = stub_with(&ids).with_stall("B", signal.clone());
        let cache = ParkingDetailCache::load(config.clone());
        let report = cache
            .populate_all(&stalling, &fast_retry(), ids, async move {
                signal.notified().await
            })
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.fetched, 1);

        let persisted = ParkingDetailCache::load(config.clone());
        assert_eq!(persisted.len(), 1);
        assert!(persisted.contains("A"));

        let healthy = stub_with(&ids);
        let report = persisted
            .populate_all(&healthy, &fast_retry(), ids, std::future::pending())
            .await
            .unwrap();

        assert_eq!(
            report,
            PopulateReport {
                fetched: 2,
                skipped: 1,
                failed: 0,
                interrupted: false,
            }
        );
        assert_eq!(healthy.detail_calls(), vec!["B", "C"]);
        assert_eq!(ParkingDetailCache::load(config).len(), 3);
    }

    #[tokio::test]
    async fn failed_ids_are_counted_not_stored() {
        let dir = tempdir().unwrap();
        let cache = ParkingDetailCache::empty(DetailCacheConfig::new(dir.path().join("d.json")));
        let stub = stub_with(&["A", "B"]).with_failing_detail("B");

        let report = cache
            .populate_all(&stub, &fast_retry(), ["A", "B"], std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 1);
        assert!(!cache.contains("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_detail_is_retried() {
        let dir = tempdir().unwrap();
        let cache = ParkingDetailCache::empty(DetailCacheConfig::new(dir.path().join("d.json")));
        let stub = stub_with(&["A"]).with_throttled_calls(2);
        let retry = RetryPolicy::new(Duration::from_secs(1), 3);

        let start = tokio::time::Instant::now();
        let a = cache.get_or_fetch(&stub, &retry, "A").await.unwrap();

        assert_eq!(a, detail("A"));
        assert_eq!(stub.detail_calls(), vec!["A", "A", "A"]);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(cache.contains("A"));
    }

    #[test]
    fn load_keeps_records_with_unusual_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("details.json");
        std::fs::write(
            &path,
            r#"{"A": {"name": {"nl": "P1"}, "city": null}, "B": {"name": "P2"}}"#,
        )
        .unwrap();

        let cache = ParkingDetailCache::load(DetailCacheConfig::new(&path));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("A").map(|d| d.name().to_string()), Some(String::new()));
        assert_eq!(cache.get("B").map(|d| d.name().to_string()), Some("P2".to_string()));

        cache.flush().unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written["A"]["city"].is_null());
        assert_eq!(written["A"]["name"]["nl"], "P1");
    }
}
