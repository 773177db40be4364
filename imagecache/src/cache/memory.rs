//! In-memory tier with cost-bounded LRU eviction using moka.
//!
//! Entries hold decoded blobs behind an `Arc` and are weighted by the byte
//! length of their encoded form. Moka evicts least-recently-used entries once
//! the total weight exceeds the capacity. Entries may disappear at any time
//! without notice; a subsequent `get` simply reports a miss and the caller
//! falls back to the disk tier.
//!
//! Memory entries carry no TTL. Reading one never affects disk timestamps.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;

/// A decoded blob annotated with its cost.
struct MemoryEntry<B> {
    blob: Arc<B>,
    cost: u32,
}

impl<B> Clone for MemoryEntry<B> {
    fn clone(&self) -> Self {
        Self {
            blob: Arc::clone(&self.blob),
            cost: self.cost,
        }
    }
}

/// Bounded in-memory cache of decoded blobs keyed by logical key.
pub struct MemoryTier<B> {
    cache: MokaCache<String, MemoryEntry<B>>,
    capacity: u64,
}

impl<B: Send + Sync + 'static> MemoryTier<B> {
    /// Create a memory tier holding at most `capacity` bytes of cost.
    pub fn new(capacity: u64) -> Self {
        let cache = MokaCache::builder()
            .eviction_policy(EvictionPolicy::lru())
            // moka uses u32 for weights; costs are capped on insert
            .weigher(|_key: &String, entry: &MemoryEntry<B>| -> u32 { entry.cost })
            .max_capacity(capacity)
            .build();

        Self { cache, capacity }
    }

    /// Look up a blob.
    pub async fn get(&self, key: &str) -> Option<Arc<B>> {
        self.cache.get(key).await.map(|entry| entry.blob)
    }

    /// Insert or replace a blob with the given cost in bytes.
    ///
    /// Blobs whose cost exceeds the capacity are dropped by moka.
    pub async fn put(&self, key: &str, blob: Arc<B>, cost: u64) {
        let entry = MemoryEntry {
            blob,
            cost: cost.min(u32::MAX as u64) as u32,
        };
        self.cache.insert(key.to_string(), entry).await;
        self.cache.run_pending_tasks().await;
    }

    /// Check for a key without updating recency.
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Remove a key. Returns whether it was present.
    pub async fn remove(&self, key: &str) -> bool {
        self.cache.remove(key).await.is_some()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of entries (eventually consistent).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Total cost of all entries (eventually consistent).
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Configured capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_tier_new() {
        let tier: MemoryTier<Vec<u8>> = MemoryTier::new(1_000_000);
        assert_eq!(tier.capacity(), 1_000_000);
        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
    }

    #[tokio::test]
    async fn test_memory_tier_put_and_get() {
        let tier = MemoryTier::new(1_000_000);
        tier.put("k", Arc::new(vec![1u8, 2, 3]), 3).await;

        let blob = tier.get("k").await.unwrap();
        assert_eq!(*blob, vec![1, 2, 3]);
        assert!(tier.contains("k"));
    }

    #[tokio::test]
    async fn test_memory_tier_miss() {
        let tier: MemoryTier<Vec<u8>> = MemoryTier::new(1_000_000);
        assert!(tier.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_tier_cost_tracking() {
        let tier = MemoryTier::new(1_000_000);
        tier.put("a", Arc::new(()), 1000).await;
        tier.put("b", Arc::new(()), 2000).await;

        let size = tier.size_bytes();
        assert!(size >= 3000, "expected size >= 3000, got {}", size);
        assert_eq!(tier.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_tier_remove() {
        let tier = MemoryTier::new(1_000_000);
        tier.put("k", Arc::new(1u32), 4).await;

        assert!(tier.remove("k").await);
        assert!(!tier.remove("k").await);
        assert!(tier.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_tier_clear() {
        let tier = MemoryTier::new(1_000_000);
        tier.put("a", Arc::new(1u32), 4).await;
        tier.put("b", Arc::new(2u32), 4).await;

        tier.clear().await;

        assert!(tier.get("a").await.is_none());
        assert!(tier.get("b").await.is_none());
        assert_eq!(tier.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_tier_stays_under_capacity() {
        let tier = MemoryTier::new(2500);
        for i in 0..3 {
            tier.put(&format!("k{}", i), Arc::new(vec![0u8; 1000]), 1000)
                .await;
        }
        tier.cache.run_pending_tasks().await;

        assert!(
            tier.size_bytes() <= 2500,
            "expected size <= 2500, got {}",
            tier.size_bytes()
        );
    }

    #[tokio::test]
    async fn test_memory_tier_replace_existing() {
        let tier = MemoryTier::new(1_000_000);
        tier.put("k", Arc::new(vec![1u8]), 1).await;
        tier.put("k", Arc::new(vec![2u8, 3]), 2).await;

        assert_eq!(*tier.get("k").await.unwrap(), vec![2, 3]);
        assert_eq!(tier.entry_count(), 1);
    }
}
