//! Diagnostic events and statistics.
//!
//! The cache never fails loudly during regular traffic. Instead, every hit,
//! miss, write, eviction and swallowed failure is described by a
//! [`CacheEvent`] and handed to a [`CacheObserver`]. The default
//! [`TracingObserver`] turns events into structured `tracing` records;
//! embedders can plug in their own observer to forward events elsewhere.
//!
//! [`CacheStats`] keeps lock-free counters derived from the same events.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::codec::CodecError;

/// Why a lookup missed.
#[derive(Debug)]
pub enum MissReason {
    /// Neither tier holds the key.
    NotFound,
    /// The disk entry outlived the TTL and was deleted.
    Expired,
    /// The disk entry exists but could not be read.
    Unreadable(io::Error),
    /// The disk entry could not be decoded.
    Undecodable(CodecError),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NotFound => write!(f, "not found"),
            MissReason::Expired => write!(f, "expired"),
            MissReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            MissReason::Undecodable(e) => write!(f, "undecodable: {}", e),
        }
    }
}

/// Something the cache did or failed to do.
#[derive(Debug)]
pub enum CacheEvent {
    /// Lookup served from the memory tier.
    MemoryHit { key: String },
    /// Lookup served from the disk tier and backfilled into memory.
    DiskHit { key: String, bytes: u64 },
    /// Lookup found nothing usable.
    Miss { key: String, reason: MissReason },
    /// Blob persisted to disk.
    Stored { key: String, file: String, bytes: u64 },
    /// Blob kept in memory only because the disk write failed.
    WriteFailed { key: String, file: String, error: io::Error },
    /// Blob could not be encoded; nothing was stored.
    EncodeFailed { key: String, error: CodecError },
    /// Entry removed by explicit request.
    Removed { key: String, file: String },
    /// A file could not be deleted.
    DeleteFailed { file: String, error: io::Error },
    /// File deleted by the maintenance pass because it outlived the TTL.
    Expired { file: String, bytes: u64 },
    /// File deleted by the maintenance pass to get under the disk budget.
    Evicted { file: String, bytes: u64 },
    /// The maintenance pass could not enumerate the directory.
    MaintenanceFailed { error: io::Error },
    /// Both tiers were cleared.
    Cleared,
    /// The disk tier could not be cleared.
    ClearFailed { error: io::Error },
    /// Configuration replaced.
    Reconfigured {
        namespace: String,
        time_to_live: Duration,
        max_disk_bytes: u64,
    },
}

/// Receiver for cache events.
///
/// Observers are called while the cache holds its serialization lock, so
/// they should return quickly.
pub trait CacheObserver: Send + Sync {
    /// Handle an event.
    fn on_event(&self, event: &CacheEvent);
}

/// Observer that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::MemoryHit { key } => trace!(key = %key, "Memory cache hit"),
            CacheEvent::DiskHit { key, bytes } => {
                debug!(key = %key, bytes, "Disk cache hit")
            }
            CacheEvent::Miss { key, reason } => match reason {
                MissReason::Unreadable(_) | MissReason::Undecodable(_) => {
                    warn!(key = %key, reason = %reason, "Cache miss")
                }
                _ => debug!(key = %key, reason = %reason, "Cache miss"),
            },
            CacheEvent::Stored { key, file, bytes } => {
                debug!(key = %key, file = %file, bytes, "Stored blob")
            }
            CacheEvent::WriteFailed { key, file, error } => {
                warn!(key = %key, file = %file, error = %error, "Disk write failed")
            }
            CacheEvent::EncodeFailed { key, error } => {
                warn!(key = %key, error = %error, "Blob encoding failed")
            }
            CacheEvent::Removed { key, file } => {
                debug!(key = %key, file = %file, "Removed entry")
            }
            CacheEvent::DeleteFailed { file, error } => {
                warn!(file = %file, error = %error, "Failed to delete cache file")
            }
            CacheEvent::Expired { file, bytes } => {
                debug!(file = %file, bytes, "Expired cache file")
            }
            CacheEvent::Evicted { file, bytes } => {
                debug!(file = %file, bytes, "Evicted cache file")
            }
            CacheEvent::MaintenanceFailed { error } => {
                warn!(error = %error, "Cache maintenance failed")
            }
            CacheEvent::Cleared => info!("Cache cleared"),
            CacheEvent::ClearFailed { error } => {
                warn!(error = %error, "Failed to clear disk cache")
            }
            CacheEvent::Reconfigured {
                namespace,
                time_to_live,
                max_disk_bytes,
            } => info!(
                namespace = %namespace,
                ttl_secs = time_to_live.as_secs(),
                max_disk_bytes,
                "Cache reconfigured"
            ),
        }
    }
}

/// Lock-free event counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
    bytes_evicted: AtomicU64,
}

impl CacheStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update counters for an event.
    pub fn record(&self, event: &CacheEvent) {
        match event {
            CacheEvent::MemoryHit { .. } => {
                self.memory_hits.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::DiskHit { .. } => {
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::Miss { reason, .. } => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                if matches!(reason, MissReason::Expired) {
                    self.expired.fetch_add(1, Ordering::Relaxed);
                }
            }
            CacheEvent::Stored { .. } => {
                self.writes.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::WriteFailed { .. } | CacheEvent::EncodeFailed { .. } => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::Expired { bytes, .. } => {
                self.expired.fetch_add(1, Ordering::Relaxed);
                self.bytes_evicted.fetch_add(*bytes, Ordering::Relaxed);
            }
            CacheEvent::Evicted { bytes, .. } => {
                self.evicted.fetch_add(1, Ordering::Relaxed);
                self.bytes_evicted.fetch_add(*bytes, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            bytes_evicted: self.bytes_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`CacheStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    /// Files removed for outliving the TTL, on read or during maintenance.
    pub expired: u64,
    /// Files removed to enforce the disk budget.
    pub evicted: u64,
    /// Bytes freed by expiry sweeps and evictions.
    pub bytes_evicted: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of lookups served from either tier.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.disk_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
