//! Logical cache keys and their on-disk file names.
//!
//! A [`CacheKey`] wraps the logical identifier of a blob (usually the absolute
//! form of a URL). The extension hint is derived from the URL path, so the file
//! name used by the disk tier is a pure function of the key string.
//!
//! # File Naming
//!
//! The default [`FileNaming::Truncated`] scheme percent-encodes every byte
//! outside `[A-Za-z0-9-._@]` and keeps only the last 200 characters of the
//! result. Distinct keys that share a long suffix therefore collide on disk.
//! [`FileNaming::Hashed`] avoids this by naming files after the SHA-256 of the
//! full key, at the cost of names that are no longer human-readable.
//!
//! ```text
//! https://a.com/img/x.png?w=10  ──►  https%3A%2F%2Fa.com%2Fimg%2Fx.png%3Fw%3D10.png
//! ```

use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use sha2::{Digest, Sha256};

/// Maximum number of characters kept from the encoded key.
pub const MAX_ENCODED_LEN: usize = 200;

/// Extension used when no usable hint is available.
pub const FALLBACK_EXTENSION: &str = "img";

/// Longest extension accepted as a hint.
const MAX_EXTENSION_LEN: usize = 8;

/// A logical cache key.
///
/// Two keys are equal iff their string forms are byte-equal. The extension
/// hint is computed from the string, so equal keys share one file name.
#[derive(Debug, Clone)]
pub struct CacheKey {
    key: String,
    extension: Option<String>,
}

impl CacheKey {
    /// Create a key, deriving the extension hint from the URL path.
    ///
    /// `https://host/a/b.JPG?size=2` yields the hint `jpg`; keys without a
    /// path extension carry no hint.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let extension = extension_from_url(&key);
        Self { key, extension }
    }

    /// The logical key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The extension hint, if any.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Strategy used to turn a [`CacheKey`] into a file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileNaming {
    /// Percent-encoded key, suffix-truncated to [`MAX_ENCODED_LEN`] characters.
    #[default]
    Truncated,
    /// Lowercase hex SHA-256 of the full key.
    Hashed,
}

impl FileNaming {
    /// File name for `key` under this scheme.
    pub fn file_name(&self, key: &CacheKey) -> String {
        match self {
            FileNaming::Truncated => encode_file_name(key.as_str(), key.extension()),
            FileNaming::Hashed => hashed_file_name(key.as_str(), key.extension()),
        }
    }
}

/// Derive a filesystem-safe, length-bounded file name from a logical key.
///
/// Never fails: when the key cannot be encoded (it is empty) a random
/// unique stem is used instead, so the entry is written but can never be
/// found again by the same key.
pub fn encode_file_name(key: &str, extension: Option<&str>) -> String {
    let stem = match percent_encode(key) {
        Some(encoded) => truncate_suffix(encoded),
        None => random_stem(),
    };
    with_extension(stem, extension)
}

/// File name built from the SHA-256 of the full key.
pub fn hashed_file_name(key: &str, extension: Option<&str>) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut stem = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(stem, "{:02x}", byte);
    }
    with_extension(stem, extension)
}

fn is_allowed(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'@')
}

fn percent_encode(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }

    let mut encoded = String::with_capacity(key.len());
    for &byte in key.as_bytes() {
        if is_allowed(byte) {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    Some(encoded)
}

fn truncate_suffix(encoded: String) -> String {
    let stem = if encoded.len() > MAX_ENCODED_LEN {
        // The encoded string is pure ASCII, so byte offsets are char offsets.
        encoded[encoded.len() - MAX_ENCODED_LEN..].to_string()
    } else {
        encoded
    };

    // Leading dots would hide the file from directory listings.
    match stem.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => stem,
    }
}

fn random_stem() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn with_extension(stem: String, extension: Option<&str>) -> String {
    let extension = extension
        .and_then(sanitize_extension)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    format!("{}.{}", stem, extension)
}

fn sanitize_extension(extension: &str) -> Option<String> {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty()
        || extension.len() > MAX_EXTENSION_LEN
        || !extension.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Extract the extension of the last path segment of a URL-like key.
fn extension_from_url(key: &str) -> Option<String> {
    let without_fragment = key.split('#').next().unwrap_or(key);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    // Skip "scheme://authority" so host names are not mistaken for paths.
    let path = match without_query.find("://") {
        Some(idx) => {
            let rest = &without_query[idx + 3..];
            &rest[rest.find('/')?..]
        }
        None => without_query,
    };

    let segment = path.rsplit('/').next()?;
    let (name, extension) = segment.rsplit_once('.')?;
    if name.is_empty() {
        return None;
    }
    sanitize_extension(extension)
}
