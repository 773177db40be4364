//! Cache management commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use imagecache::cache::{CacheKey, ImageCache};
use imagecache::codec::{EncodeHint, ImageCodec};
use imagecache::config::{format_duration, format_size, ConfigFile};

use crate::error::CliError;

/// Cache subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk usage and configuration
    Stats,

    /// Delete expired files and enforce the size budget now
    Prune,

    /// Remove every cached entry
    Clear,

    /// Store an image file under a key
    Put {
        /// Cache key, typically the image URL
        key: String,

        /// Image file to store
        file: PathBuf,

        /// Store as JPEG with this quality (1-100) instead of the key's format
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },

    /// Write a cached image to a file
    Get {
        /// Cache key
        key: String,

        /// Output file; the format follows its extension
        output: PathBuf,
    },

    /// Remove one key
    Remove {
        /// Cache key
        key: String,
    },
}

/// Open the configured cache.
pub async fn open(config: &ConfigFile) -> Result<ImageCache<ImageCodec>, CliError> {
    ImageCache::open(ImageCodec, config.to_options())
        .await
        .map_err(CliError::CacheOpen)
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction, config: &ConfigFile) -> Result<(), CliError> {
    let cache = open(config).await?;

    match action {
        CacheAction::Stats => run_stats(&cache).await,
        CacheAction::Prune => {
            let report = cache.run_maintenance().await;
            println!("{}", report);
            Ok(())
        }
        CacheAction::Clear => {
            let dir = cache.namespace_dir().await;
            println!("Clearing cache at: {}", dir.display());
            cache.clear().await;
            Ok(())
        }
        CacheAction::Put { key, file, quality } => run_put(&cache, &key, &file, quality).await,
        CacheAction::Get { key, output } => run_get(&cache, &key, &output).await,
        CacheAction::Remove { key } => {
            cache.remove(&CacheKey::new(key.as_str())).await;
            println!("Removed {}", key);
            Ok(())
        }
    }
}

async fn run_stats(cache: &ImageCache<ImageCodec>) -> Result<(), CliError> {
    let config = cache.config().await;
    let (files, bytes) = cache.disk_usage().await.map_err(CliError::CacheStats)?;

    println!("Disk cache: {}", cache.namespace_dir().await.display());
    println!("  Files:  {}", files);
    println!(
        "  Size:   {} of {}",
        format_size(bytes),
        format_size(config.max_disk_bytes)
    );
    println!("  TTL:    {}", format_duration(config.time_to_live));
    Ok(())
}

async fn run_put(
    cache: &ImageCache<ImageCodec>,
    key: &str,
    file: &Path,
    quality: Option<u8>,
) -> Result<(), CliError> {
    let image = image::open(file).map_err(|e| CliError::ReadImage {
        path: file.to_path_buf(),
        message: e.to_string(),
    })?;

    let key = CacheKey::new(key);
    let hint = match quality {
        Some(quality) => Some(EncodeHint::Lossy { quality }),
        None => key.extension().map(EncodeHint::from_extension),
    };

    cache.put(&key, image, hint).await;

    if !cache.contains(&key).await {
        return Err(CliError::NotCached(key.to_string()));
    }
    println!("Stored {} at {}", key, cache.file_path(&key).await.display());
    Ok(())
}

async fn run_get(
    cache: &ImageCache<ImageCodec>,
    key: &str,
    output: &Path,
) -> Result<(), CliError> {
    let key = CacheKey::new(key);
    let image = cache
        .get(&key)
        .await
        .ok_or_else(|| CliError::NotCached(key.to_string()))?;

    image.save(output).map_err(|e| CliError::WriteImage {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;

    println!(
        "Wrote {}x{} image to {}",
        image.width(),
        image.height(),
        output.display()
    );
    Ok(())
}
