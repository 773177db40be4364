//! Process-wide default cache.
//!
//! Composition-root convenience for applications that want a single image
//! cache without wiring one through their own state. Library code should take
//! an `ImageCache` (or `Arc<ImageCache<_>>`) as a parameter instead.

use std::sync::OnceLock;

use crate::cache::{CacheOptions, ImageCache};
use crate::codec::ImageCodec;

/// The shared image cache, rooted at the platform cache directory with the
/// default configuration. Created on first use.
pub fn shared_cache() -> &'static ImageCache<ImageCodec> {
    static SHARED: OnceLock<ImageCache<ImageCodec>> = OnceLock::new();
    SHARED.get_or_init(|| ImageCache::from_options(ImageCodec, CacheOptions::platform_default()))
}
