//! ImageCache - two-tier image cache with TTL expiry and LRU eviction
//!
//! Blobs (typically decoded images) are kept in a bounded in-memory tier and
//! persisted to a bounded on-disk tier so they survive restarts. Disk entries
//! expire after a configurable time-to-live and the least recently touched
//! entries are evicted whenever a write pushes the directory over its size
//! budget.
//!
//! # Modules
//!
//! - [`cache`] - the cache engine: key encoding, memory and disk tiers,
//!   eviction and the [`ImageCache`](cache::ImageCache) facade
//! - [`codec`] - conversion between stored bytes and decoded blobs
//! - [`config`] - INI configuration file
//! - [`logging`] - `tracing` subscriber setup
//! - [`shared`] - process-wide default instance

pub mod cache;
pub mod codec;
pub mod config;
pub mod logging;
pub mod shared;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
