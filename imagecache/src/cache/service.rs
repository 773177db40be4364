//! The cache facade.
//!
//! [`ImageCache`] is the single entry point coordinating the memory and disk
//! tiers. Every operation body runs while holding one async mutex, so at most
//! one `get`/`put`/`remove`/`clear`/`reconfigure` executes at a time on an
//! instance and operations observe the order in which they acquired the lock.
//!
//! # Lookup
//!
//! ```text
//! get(key) ─► memory ─hit─► blob
//!               │miss
//!               ▼
//!             disk.read (TTL, touch) ─hit─► decode ─► backfill memory ─► blob
//!               │miss/expired
//!               ▼
//!             None
//! ```
//!
//! # Write
//!
//! ```text
//! put(key, blob) ─► encode ─► memory ─► disk.write ─► maintenance pass
//! ```
//!
//! Network fetches happen before `put` is called and never under the lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::config::{CacheConfig, CacheOptions};
use crate::cache::disk::{DiskRead, DiskTier};
use crate::cache::error::CacheError;
use crate::cache::events::{
    CacheEvent, CacheObserver, CacheStats, CacheStatsSnapshot, MissReason, TracingObserver,
};
use crate::cache::eviction::{self, EvictionPolicy, EvictionReport};
use crate::cache::key::{CacheKey, FileNaming};
use crate::cache::memory::MemoryTier;
use crate::codec::{BlobCodec, EncodeHint};

/// State mutated only under the serialization lock.
struct CacheState {
    config: CacheConfig,
    disk: DiskTier,
}

impl CacheState {
    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            time_to_live: self.config.time_to_live,
            max_disk_bytes: self.config.max_disk_bytes,
        }
    }
}

/// Two-tier blob cache keyed by logical key.
pub struct ImageCache<C: BlobCodec> {
    codec: C,
    memory: MemoryTier<C::Blob>,
    state: Mutex<CacheState>,
    root: PathBuf,
    naming: FileNaming,
    observer: Arc<dyn CacheObserver>,
    stats: CacheStats,
}

impl<C: BlobCodec> ImageCache<C> {
    /// Create a cache. The namespace directory is created on first write.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNamespace`] if the namespace is not a
    /// single directory name.
    pub fn new(codec: C, options: CacheOptions) -> Result<Self, CacheError> {
        options.config.validate()?;
        Ok(Self::from_options(codec, options))
    }

    /// Create a cache and its namespace directory.
    pub async fn open(codec: C, options: CacheOptions) -> Result<Self, CacheError> {
        let cache = Self::new(codec, options)?;
        cache.state.lock().await.disk.ensure_dir().await?;
        Ok(cache)
    }

    pub(crate) fn from_options(codec: C, options: CacheOptions) -> Self {
        let disk = DiskTier::new(options.namespace_dir());
        Self {
            codec,
            memory: MemoryTier::new(options.memory_capacity),
            state: Mutex::new(CacheState {
                config: options.config,
                disk,
            }),
            root: options.root,
            naming: options.file_naming,
            observer: Arc::new(TracingObserver),
            stats: CacheStats::new(),
        }
    }

    /// Replace the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn emit(&self, event: CacheEvent) {
        self.stats.record(&event);
        self.observer.on_event(&event);
    }

    /// Look up a blob, falling back from memory to disk.
    ///
    /// A disk hit refreshes the file's last-touched time and backfills the
    /// memory tier. Expired files are deleted and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<C::Blob>> {
        let state = self.state.lock().await;

        if let Some(blob) = self.memory.get(key.as_str()).await {
            self.emit(CacheEvent::MemoryHit {
                key: key.to_string(),
            });
            return Some(blob);
        }

        let file = self.naming.file_name(key);
        let bytes = match state.disk.read(&file, state.config.time_to_live).await {
            DiskRead::Hit(bytes) => bytes,
            DiskRead::Missing => return self.miss(key, MissReason::NotFound),
            DiskRead::Expired => return self.miss(key, MissReason::Expired),
            DiskRead::Unreadable(e) => return self.miss(key, MissReason::Unreadable(e)),
        };

        match self.codec.decode(&bytes) {
            Ok(blob) => {
                let blob = Arc::new(blob);
                let cost = bytes.len() as u64;
                self.memory
                    .put(key.as_str(), Arc::clone(&blob), cost)
                    .await;
                self.emit(CacheEvent::DiskHit {
                    key: key.to_string(),
                    bytes: cost,
                });
                Some(blob)
            }
            Err(e) => self.miss(key, MissReason::Undecodable(e)),
        }
    }

    fn miss(&self, key: &CacheKey, reason: MissReason) -> Option<Arc<C::Blob>> {
        self.emit(CacheEvent::Miss {
            key: key.to_string(),
            reason,
        });
        None
    }

    /// Store a blob in both tiers, then run the maintenance pass.
    ///
    /// The memory tier is updated even if the disk write fails. If the blob
    /// cannot be encoded nothing is stored.
    pub async fn put(&self, key: &CacheKey, blob: C::Blob, hint: Option<EncodeHint>) {
        let state = self.state.lock().await;

        let bytes = match self.codec.encode(&blob, hint) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.emit(CacheEvent::EncodeFailed {
                    key: key.to_string(),
                    error,
                });
                return;
            }
        };

        self.memory
            .put(key.as_str(), Arc::new(blob), bytes.len() as u64)
            .await;

        let file = self.naming.file_name(key);
        match state.disk.write(&file, &bytes).await {
            Ok(()) => self.emit(CacheEvent::Stored {
                key: key.to_string(),
                file,
                bytes: bytes.len() as u64,
            }),
            Err(error) => self.emit(CacheEvent::WriteFailed {
                key: key.to_string(),
                file,
                error,
            }),
        }

        self.maintain(&state).await;
    }

    /// Remove a key from both tiers. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &CacheKey) {
        let state = self.state.lock().await;

        self.memory.remove(key.as_str()).await;

        let file = self.naming.file_name(key);
        match state.disk.delete(&file).await {
            Ok(_) => self.emit(CacheEvent::Removed {
                key: key.to_string(),
                file,
            }),
            Err(error) => self.emit(CacheEvent::DeleteFailed { file, error }),
        }
    }

    /// Empty the memory tier, then delete and recreate the namespace directory.
    pub async fn clear(&self) {
        let state = self.state.lock().await;

        self.memory.clear().await;

        match state.disk.clear_all().await {
            Ok(()) => self.emit(CacheEvent::Cleared),
            Err(error) => self.emit(CacheEvent::ClearFailed { error }),
        }
    }

    /// Replace the active configuration.
    ///
    /// Applies to operations issued afterwards only: no file is touched,
    /// deleted or re-timed here. A smaller budget is enforced by the next
    /// write's maintenance pass. A new namespace switches the disk tier to a
    /// different directory; the memory tier is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidNamespace`] and keeps the old
    /// configuration if the namespace is invalid.
    pub async fn reconfigure(&self, config: CacheConfig) -> Result<(), CacheError> {
        config.validate()?;

        let mut state = self.state.lock().await;
        if config.namespace != state.config.namespace {
            state.disk = DiskTier::new(self.root.join(&config.namespace));
        }

        self.emit(CacheEvent::Reconfigured {
            namespace: config.namespace.clone(),
            time_to_live: config.time_to_live,
            max_disk_bytes: config.max_disk_bytes,
        });
        state.config = config;
        Ok(())
    }

    /// Run the expire-then-size maintenance pass now.
    pub async fn run_maintenance(&self) -> EvictionReport {
        let state = self.state.lock().await;
        self.maintain(&state).await
    }

    async fn maintain(&self, state: &CacheState) -> EvictionReport {
        let sink = StatsSink { cache: self };
        eviction::run_maintenance(&state.disk, state.policy(), &sink).await
    }

    /// Whether a key is held in memory or by a fresh disk file.
    ///
    /// Does not refresh any timestamp or update statistics.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let state = self.state.lock().await;
        if self.memory.contains(key.as_str()) {
            return true;
        }
        state
            .disk
            .is_fresh(&self.naming.file_name(key), state.config.time_to_live)
            .await
    }

    /// Number of files and total bytes in the namespace directory.
    pub async fn disk_usage(&self) -> Result<(usize, u64), CacheError> {
        let state = self.state.lock().await;
        Ok(state.disk.usage().await?)
    }

    /// The active configuration.
    pub async fn config(&self) -> CacheConfig {
        self.state.lock().await.config.clone()
    }

    /// Current namespace directory.
    pub async fn namespace_dir(&self) -> PathBuf {
        self.state.lock().await.disk.dir().to_path_buf()
    }

    /// Path a key is (or would be) stored at.
    pub async fn file_path(&self, key: &CacheKey) -> PathBuf {
        self.state
            .lock()
            .await
            .disk
            .path_for(&self.naming.file_name(key))
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Memory tier entry count and weighted size.
    pub fn memory_usage(&self) -> (u64, u64) {
        (self.memory.entry_count(), self.memory.size_bytes())
    }
}

/// Routes eviction events through the cache's stats and observer.
struct StatsSink<'a, C: BlobCodec> {
    cache: &'a ImageCache<C>,
}

impl<C: BlobCodec> CacheObserver for StatsSink<'_, C> {
    fn on_event(&self, event: &CacheEvent) {
        self.cache.stats.record(event);
        self.cache.observer.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, RawCodec};
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(temp: &TempDir) -> CacheOptions {
        CacheOptions::new(temp.path()).with_config(CacheConfig::default().with_namespace("test"))
    }

    async fn open(temp: &TempDir) -> ImageCache<RawCodec> {
        ImageCache::open(RawCodec, options(temp)).await.unwrap()
    }

    /// Codec whose encode always fails.
    struct BrokenCodec;

    impl BlobCodec for BrokenCodec {
        type Blob = Vec<u8>;

        fn encode(&self, _: &Vec<u8>, _: Option<EncodeHint>) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::Encode("broken".into()))
        }

        fn decode(&self, _: &[u8]) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::Decode("broken".into()))
        }
    }

    #[tokio::test]
    async fn test_open_creates_namespace_dir() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;

        assert!(temp.path().join("test").is_dir());
        assert_eq!(cache.namespace_dir().await, temp.path().join("test"));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_namespace() {
        let temp = TempDir::new().unwrap();
        let options = CacheOptions::new(temp.path())
            .with_config(CacheConfig::default().with_namespace("../escape"));

        let result = ImageCache::new(RawCodec, options);
        assert!(matches!(result, Err(CacheError::InvalidNamespace(_))));
    }

    #[tokio::test]
    async fn test_put_then_get_from_memory() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        let key = CacheKey::new("https://a/x.png");

        cache.put(&key, vec![1, 2, 3], None).await;

        assert_eq!(*cache.get(&key).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.stats().memory_hits, 1);
        assert!(cache.file_path(&key).await.exists());
    }

    #[tokio::test]
    async fn test_get_backfills_from_disk() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("https://a/x.png");
        {
            let cache = open(&temp).await;
            cache.put(&key, vec![9; 16], None).await;
        }

        // A fresh instance has an empty memory tier.
        let cache = open(&temp).await;
        assert_eq!(*cache.get(&key).await.unwrap(), vec![9; 16]);
        assert_eq!(*cache.get(&key).await.unwrap(), vec![9; 16]);

        let stats = cache.stats();
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.memory_hits, 1);
    }

    #[tokio::test]
    async fn test_get_miss() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;

        assert!(cache.get(&CacheKey::new("https://a/none.png")).await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_remove_clears_both_tiers() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        let key = CacheKey::new("https://a/x.png");
        cache.put(&key, vec![1], None).await;

        cache.remove(&key).await;
        cache.remove(&key).await;

        assert!(cache.get(&key).await.is_none());
        assert!(!cache.file_path(&key).await.exists());
    }

    #[tokio::test]
    async fn test_remove_with_equal_key_deletes_file() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        let stored = CacheKey::new("https://a/x.png");
        let other = CacheKey::from("https://a/x.png".to_string());
        assert_eq!(stored, other);

        cache.put(&stored, vec![1, 2, 3], None).await;
        cache.remove(&other).await;

        assert!(cache.get(&stored).await.is_none());
        let dir = cache.namespace_dir().await;
        assert_eq!(std::fs::read_dir(dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_encode_failure_stores_nothing() {
        let temp = TempDir::new().unwrap();
        let cache = ImageCache::open(BrokenCodec, options(&temp)).await.unwrap();
        let key = CacheKey::new("k");

        cache.put(&key, vec![1, 2], None).await;

        assert!(!cache.contains(&key).await);
        assert_eq!(cache.disk_usage().await.unwrap(), (0, 0));
        assert_eq!(cache.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("https://a/x.png");
        {
            let cache = open(&temp).await;
            cache.put(&key, vec![1, 2, 3], None).await;
        }

        let cache = ImageCache::open(BrokenCodec, options(&temp)).await.unwrap();
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_memory_updated_when_disk_write_fails() {
        let temp = TempDir::new().unwrap();
        // A regular file where the namespace directory should be.
        std::fs::write(temp.path().join("test"), b"not a dir").unwrap();
        let cache = ImageCache::new(RawCodec, options(&temp)).unwrap();
        let key = CacheKey::new("https://a/x.png");

        cache.put(&key, vec![4, 5], None).await;

        assert_eq!(*cache.get(&key).await.unwrap(), vec![4, 5]);
        assert_eq!(cache.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_contains_does_not_count_as_lookup() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        let key = CacheKey::new("https://a/x.png");

        assert!(!cache.contains(&key).await);
        cache.put(&key, vec![1], None).await;
        assert!(cache.contains(&key).await);

        let stats = cache.stats();
        assert_eq!(stats.memory_hits + stats.disk_hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_reconfigure_switches_namespace() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        let key = CacheKey::new("https://a/x.png");
        cache.put(&key, vec![1], None).await;

        let config = cache.config().await.with_namespace("other");
        cache.reconfigure(config).await.unwrap();
        cache.put(&CacheKey::new("https://a/y.png"), vec![2], None).await;

        assert_eq!(cache.namespace_dir().await, temp.path().join("other"));
        assert_eq!(std::fs::read_dir(temp.path().join("test")).unwrap().count(), 1);
        assert_eq!(std::fs::read_dir(temp.path().join("other")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_reconfigure_rejects_invalid_namespace() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;

        let result = cache
            .reconfigure(CacheConfig::default().with_namespace("a/b"))
            .await;

        assert!(result.is_err());
        assert_eq!(cache.config().await.namespace, "test");
    }

    #[tokio::test]
    async fn test_reconfigure_ttl_applies_to_next_read() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("https://a/x.png");
        {
            let cache = open(&temp).await;
            cache.put(&key, vec![1], None).await;
        }
        let cache = open(&temp).await;
        let path = cache.file_path(&key).await;
        let old = std::time::SystemTime::now() - Duration::from_secs(120);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(old)).unwrap();

        // Still fresh under the default 7-day TTL.
        assert!(cache.contains(&key).await);

        let config = cache.config().await.with_time_to_live(Duration::from_secs(60));
        cache.reconfigure(config).await.unwrap();
        assert!(path.exists());

        assert!(cache.get(&key).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_hashed_file_naming() {
        let temp = TempDir::new().unwrap();
        let cache = ImageCache::open(
            RawCodec,
            options(&temp).with_file_naming(FileNaming::Hashed),
        )
        .await
        .unwrap();
        let key = CacheKey::new("https://a/x.png");

        cache.put(&key, vec![7], None).await;

        let path = cache.file_path(&key).await;
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".png".len());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_run_maintenance_reports() {
        let temp = TempDir::new().unwrap();
        let cache = open(&temp).await;
        cache.put(&CacheKey::new("a"), vec![0; 100], None).await;
        cache.put(&CacheKey::new("b"), vec![0; 100], None).await;

        let config = cache.config().await.with_max_disk_bytes(150);
        cache.reconfigure(config).await.unwrap();
        let report = cache.run_maintenance().await;

        assert_eq!(report.evicted, 1);
        assert_eq!(report.remaining_bytes, 100);
        assert_eq!(cache.stats().evicted, 1);
    }
}
