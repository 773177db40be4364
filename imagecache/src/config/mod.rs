//! Configuration file support.
//!
//! Settings live in an INI file, by default `~/.imagecache/config.ini`:
//!
//! ```ini
//! [cache]
//! directory = /home/me/.cache
//! namespace = ImageCache
//! ttl = 7d
//! disk_size = 200MB
//! memory_size = 64MB
//! naming = truncated
//! ```
//!
//! Every key is optional; missing keys take the library defaults.

mod size;

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::cache::{
    default_cache_root, CacheConfig, CacheOptions, FileNaming, DEFAULT_MEMORY_CAPACITY,
};

pub use size::{format_duration, format_size, parse_duration, parse_size};

const SECTION: &str = "cache";

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("Failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// The file could not be written.
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// The `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSection {
    pub directory: PathBuf,
    pub config: CacheConfig,
    pub memory_size: u64,
    pub naming: FileNaming,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            directory: default_cache_root(),
            config: CacheConfig::default(),
            memory_size: DEFAULT_MEMORY_CAPACITY,
            naming: FileNaming::default(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSection,
}

impl ConfigFile {
    /// Load from the default path, or defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut cache = CacheSection::default();

        let Some(section) = ini.section(Some(SECTION)) else {
            return Ok(Self { cache });
        };

        if let Some(directory) = section.get("directory") {
            cache.directory = expand_home(directory.trim());
        }
        if let Some(namespace) = section.get("namespace") {
            cache.config.namespace = namespace.trim().to_string();
        }
        if let Some(value) = section.get("ttl") {
            cache.config.time_to_live = parse_duration(value).ok_or_else(|| invalid("ttl", value))?;
        }
        if let Some(value) = section.get("disk_size") {
            cache.config.max_disk_bytes = parse_size(value).ok_or_else(|| invalid("disk_size", value))?;
        }
        if let Some(value) = section.get("memory_size") {
            cache.memory_size = parse_size(value).ok_or_else(|| invalid("memory_size", value))?;
        }
        if let Some(value) = section.get("naming") {
            cache.naming = match value.trim().to_ascii_lowercase().as_str() {
                "truncated" => FileNaming::Truncated,
                "hashed" => FileNaming::Hashed,
                _ => return Err(invalid("naming", value)),
            };
        }

        cache
            .config
            .validate()
            .map_err(|_| invalid("namespace", &cache.config.namespace))?;

        Ok(Self { cache })
    }

    /// Write to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let naming = match self.cache.naming {
            FileNaming::Truncated => "truncated",
            FileNaming::Hashed => "hashed",
        };

        let mut ini = Ini::new();
        ini.with_section(Some(SECTION))
            .set("directory", self.cache.directory.display().to_string())
            .set("namespace", self.cache.config.namespace.as_str())
            .set("ttl", format_duration(self.cache.config.time_to_live))
            .set("disk_size", self.cache.config.max_disk_bytes.to_string())
            .set("memory_size", self.cache.memory_size.to_string())
            .set("naming", naming);

        ini.write_to_file(path).map_err(write_err)
    }

    /// Cache options described by this file.
    pub fn to_options(&self) -> CacheOptions {
        CacheOptions::new(self.cache.directory.clone())
            .with_config(self.cache.config.clone())
            .with_memory_capacity(self.cache.memory_size)
            .with_file_naming(self.cache.naming)
    }
}

/// Default configuration file path (`~/.imagecache/config.ini`).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".imagecache").join("config.ini"))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{}.{}", SECTION, key),
        value: value.to_string(),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
