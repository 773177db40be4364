//! Cache error types.
//!
//! Only construction, reconfiguration and explicit diagnostics return these.
//! Regular cache traffic (`get`, `put`, `remove`, `clear`) degrades to "no
//! effect" and reports failures through `CacheEvent`s instead.

use thiserror::Error;

/// Errors surfaced by the cache facade.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while preparing or inspecting the cache directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The namespace is not a single, non-hidden directory name.
    #[error("Invalid namespace '{0}': must be a single non-hidden directory name")]
    InvalidNamespace(String),
}
