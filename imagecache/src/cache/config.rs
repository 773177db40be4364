//! Cache configuration.
//!
//! [`CacheConfig`] holds the settings that may change while the cache is
//! running (TTL, disk budget, namespace). [`CacheOptions`] adds the settings
//! fixed at construction time: the cache root, the memory tier capacity and
//! the file naming scheme.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::cache::error::CacheError;
use crate::cache::key::FileNaming;

/// Default time-to-live for disk entries (7 days).
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default disk budget (200 MiB).
pub const DEFAULT_MAX_DISK_BYTES: u64 = 200 * 1024 * 1024;

/// Default namespace directory name.
pub const DEFAULT_NAMESPACE: &str = "ImageCache";

/// Default memory tier capacity (64 MiB).
pub const DEFAULT_MEMORY_CAPACITY: u64 = 64 * 1024 * 1024;

/// Runtime-mutable cache settings.
///
/// Changes made through `ImageCache::reconfigure` only affect operations
/// issued afterwards. Existing files keep their timestamps and are judged
/// against the new TTL the next time they are read or swept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of a disk entry since it was last touched.
    pub time_to_live: Duration,

    /// Size budget enforced by the maintenance pass after each write.
    pub max_disk_bytes: u64,

    /// Subdirectory of the cache root holding this cache's files.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            time_to_live: DEFAULT_TIME_TO_LIVE,
            max_disk_bytes: DEFAULT_MAX_DISK_BYTES,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Set the time-to-live.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Set the disk budget in bytes.
    pub fn with_max_disk_bytes(mut self, max_disk_bytes: u64) -> Self {
        self.max_disk_bytes = max_disk_bytes;
        self
    }

    /// Set the namespace directory name.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Check that the namespace is a single, non-hidden path component.
    pub fn validate(&self) -> Result<(), CacheError> {
        let mut components = Path::new(&self.namespace).components();
        let valid = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !self.namespace.starts_with('.')
            && !self.namespace.contains(['/', '\\']);

        if valid {
            Ok(())
        } else {
            Err(CacheError::InvalidNamespace(self.namespace.clone()))
        }
    }
}

/// Construction-time options for `ImageCache`.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Directory under which the namespace directory is created.
    pub root: PathBuf,

    /// Initial runtime configuration.
    pub config: CacheConfig,

    /// Memory tier capacity in bytes.
    pub memory_capacity: u64,

    /// File naming scheme for disk entries.
    pub file_naming: FileNaming,
}

impl CacheOptions {
    /// Options rooted at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: CacheConfig::default(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            file_naming: FileNaming::default(),
        }
    }

    /// Options rooted at the platform cache directory.
    pub fn platform_default() -> Self {
        Self::new(default_cache_root())
    }

    /// Set the initial runtime configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the memory tier capacity.
    pub fn with_memory_capacity(mut self, bytes: u64) -> Self {
        self.memory_capacity = bytes;
        self
    }

    /// Set the file naming scheme.
    pub fn with_file_naming(mut self, naming: FileNaming) -> Self {
        self.file_naming = naming;
        self
    }

    /// Full path of the namespace directory.
    pub fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.config.namespace)
    }
}

/// Platform cache root (`~/.cache` on Linux, `~/Library/Caches` on macOS).
///
/// Falls back to the system temp directory when the platform has none.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.time_to_live, Duration::from_secs(604_800));
        assert_eq!(config.max_disk_bytes, 209_715_200);
        assert_eq!(config.namespace, "ImageCache");
    }

    #[test]
    fn test_config_builders() {
        let config = CacheConfig::default()
            .with_time_to_live(Duration::from_secs(1))
            .with_max_disk_bytes(1_000)
            .with_namespace("t");
        assert_eq!(config.time_to_live, Duration::from_secs(1));
        assert_eq!(config.max_disk_bytes, 1_000);
        assert_eq!(config.namespace, "t");
    }

    #[test]
    fn test_validate_namespace() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::default().with_namespace("thumbs-v2").validate().is_ok());

        for bad in ["", ".", "..", ".hidden", "a/b", "/abs", "a\\b"] {
            let result = CacheConfig::default().with_namespace(bad).validate();
            assert!(
                matches!(result, Err(CacheError::InvalidNamespace(_))),
                "namespace {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_options_namespace_dir() {
        let options = CacheOptions::new("/tmp/root")
            .with_config(CacheConfig::default().with_namespace("avatars"))
            .with_memory_capacity(1024)
            .with_file_naming(FileNaming::Hashed);
        assert_eq!(options.namespace_dir(), PathBuf::from("/tmp/root/avatars"));
        assert_eq!(options.memory_capacity, 1024);
        assert_eq!(options.file_naming, FileNaming::Hashed);
    }
}
