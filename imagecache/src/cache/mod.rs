//! Two-tier blob cache.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  ImageCache (facade)                   │
//! │   get / put / remove / clear / reconfigure             │
//! │   one async mutex serializes every operation           │
//! └──────────┬──────────────────┬─────────────────┬───────┘
//!            │                  │                 │
//!            ▼                  ▼                 ▼
//! ┌──────────────────┐ ┌─────────────────┐ ┌──────────────────┐
//! │   MemoryTier     │ │    DiskTier     │ │ Eviction engine  │
//! │ moka, LRU, cost  │ │ one file / key  │ │ expire then LRU  │
//! │ = encoded bytes  │ │ mtime = touched │ │ after each write │
//! └──────────────────┘ └─────────────────┘ └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imagecache::cache::{CacheKey, CacheOptions, ImageCache};
//! use imagecache::codec::{EncodeHint, ImageCodec};
//!
//! let cache = ImageCache::open(ImageCodec, CacheOptions::platform_default()).await?;
//!
//! let key = CacheKey::new("https://example.com/photo.jpg");
//! cache.put(&key, image, Some(EncodeHint::Lossy { quality: 80 })).await;
//!
//! if let Some(image) = cache.get(&key).await {
//!     // Cache hit
//! }
//! ```

mod config;
mod disk;
mod error;
mod events;
mod eviction;
mod key;
mod memory;
mod service;

pub use config::{
    default_cache_root, CacheConfig, CacheOptions, DEFAULT_MAX_DISK_BYTES, DEFAULT_MEMORY_CAPACITY,
    DEFAULT_NAMESPACE, DEFAULT_TIME_TO_LIVE,
};
pub use disk::{is_expired, DiskEntry, DiskRead, DiskTier};
pub use error::CacheError;
pub use events::{
    CacheEvent, CacheObserver, CacheStats, CacheStatsSnapshot, MissReason, TracingObserver,
};
pub use eviction::{run_maintenance, sort_oldest_first, EvictionPolicy, EvictionReport};
pub use key::{
    encode_file_name, hashed_file_name, CacheKey, FileNaming, FALLBACK_EXTENSION, MAX_ENCODED_LEN,
};
pub use memory::MemoryTier;
pub use service::ImageCache;
