//! On-disk tier storing encoded bytes in a namespace directory.
//!
//! One file per logical key, no manifest: the directory listing is the index.
//! Each file's modification time is its last-touched time and drives both
//! TTL expiry and LRU ordering.
//!
//! # Layout
//!
//! ```text
//! <cache-root>/<namespace>/
//! ├── https%3A%2F%2Fa.com%2Fx.png.png
//! ├── https%3A%2F%2Fb.com%2Fy.jpg.jpg
//! └── .x.png.png.1f3a….tmp      (in-flight write, hidden)
//! ```
//!
//! Writes go to a hidden temp file that is renamed into place, so a partially
//! written file is never observable at the target path. Hidden files are
//! ignored by [`DiskTier::list`] and [`DiskTier::total_size`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tokio::fs;
use tracing::debug;

/// A regular file in the namespace directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    /// File name relative to the namespace directory.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last-touched (modification) time.
    pub last_touched: SystemTime,
}

/// Outcome of [`DiskTier::read`].
#[derive(Debug)]
pub enum DiskRead {
    /// The file exists, is fresh, and has been touched.
    Hit(Vec<u8>),
    /// No file for this name.
    Missing,
    /// The file was older than the TTL and has been deleted.
    Expired,
    /// The file exists but could not be read.
    Unreadable(io::Error),
}

impl DiskRead {
    /// Bytes on a hit, `None` otherwise.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            DiskRead::Hit(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Durable store of encoded blobs in a single directory.
#[derive(Debug, Clone)]
pub struct DiskTier {
    dir: PathBuf,
}

impl DiskTier {
    /// Create a disk tier rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The namespace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a cache file.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create the namespace directory if it does not exist.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Read a file, applying the TTL.
    ///
    /// Expired files are deleted before [`DiskRead::Expired`] is returned.
    /// Fresh files have their last-touched time set to now.
    pub async fn read(&self, name: &str, ttl: Duration) -> DiskRead {
        let path = self.path_for(name);

        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return DiskRead::Missing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return DiskRead::Missing,
            Err(e) => return DiskRead::Unreadable(e),
        };

        let now = SystemTime::now();
        if let Ok(modified) = metadata.modified() {
            if is_expired(modified, now, ttl) {
                if let Err(e) = self.delete(name).await {
                    debug!(file = %name, error = %e, "Failed to delete expired file");
                }
                return DiskRead::Expired;
            }
        }

        match fs::read(&path).await {
            Ok(bytes) => {
                if let Err(e) = set_last_touched(path, now).await {
                    debug!(file = %name, error = %e, "Failed to refresh last-touched time");
                }
                DiskRead::Hit(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => DiskRead::Missing,
            Err(e) => DiskRead::Unreadable(e),
        }
    }

    /// Check whether a fresh file exists without touching it.
    pub async fn is_fresh(&self, name: &str, ttl: Duration) -> bool {
        match fs::metadata(self.path_for(name)).await {
            Ok(m) if m.is_file() => m
                .modified()
                .map(|modified| !is_expired(modified, SystemTime::now(), ttl))
                .unwrap_or(true),
            _ => false,
        }
    }

    /// Atomically write a file and set its last-touched time to now.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.ensure_dir().await?;

        let target = self.path_for(name);
        let temp = self.path_for(&format!(".{}.{:016x}.tmp", name, rand::random::<u64>()));

        let result = async {
            fs::write(&temp, bytes).await?;
            set_last_touched(temp.clone(), SystemTime::now()).await?;
            fs::rename(&temp, &target).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result
    }

    /// Delete a file. Returns whether it existed; missing files are not an error.
    pub async fn delete(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Enumerate non-hidden regular files with size and last-touched time.
    ///
    /// The order is unspecified. A missing directory yields an empty list.
    pub async fn list(&self) -> io::Result<Vec<DiskEntry>> {
        let mut read_dir = match fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with('.') {
                continue;
            }

            // Files can vanish between listing and stat.
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(DiskEntry {
                name,
                size: metadata.len(),
                last_touched: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(entries)
    }

    /// Sum of the sizes of all non-hidden regular files (non-recursive).
    pub async fn total_size(&self) -> io::Result<u64> {
        Ok(self.list().await?.iter().map(|e| e.size).sum())
    }

    /// Number of files and their total size.
    pub async fn usage(&self) -> io::Result<(usize, u64)> {
        let entries = self.list().await?;
        Ok((entries.len(), entries.iter().map(|e| e.size).sum()))
    }

    /// Delete the whole namespace directory and recreate it empty.
    pub async fn clear_all(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.ensure_dir().await
    }
}

/// Whether an entry last touched at `last_touched` has outlived `ttl` at `now`.
///
/// Timestamps in the future are never expired.
pub fn is_expired(last_touched: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    now.duration_since(last_touched)
        .map(|age| age > ttl)
        .unwrap_or(false)
}

async fn set_last_touched(path: PathBuf, time: SystemTime) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        filetime::set_file_mtime(&path, FileTime::from_system_time(time))
    })
    .await
    .map_err(io::Error::other)?
}
