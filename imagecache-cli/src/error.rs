//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use imagecache::cache::CacheError;
use imagecache::config::ConfigError;

/// Errors surfaced to the user. Every variant exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    Config(String),
    /// The cache could not be opened.
    CacheOpen(CacheError),
    /// Reading cache statistics failed.
    CacheStats(CacheError),
    /// An input image could not be read.
    ReadImage { path: PathBuf, message: String },
    /// An output image could not be written.
    WriteImage { path: PathBuf, message: String },
    /// The requested key is not cached.
    NotCached(String),
    /// Logging could not be initialised.
    Logging(String),
    /// The async runtime could not be started.
    Runtime(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::CacheOpen(e) => write!(f, "Failed to open cache: {}", e),
            CliError::CacheStats(e) => write!(f, "Failed to read cache statistics: {}", e),
            CliError::ReadImage { path, message } => {
                write!(f, "Failed to read image {}: {}", path.display(), message)
            }
            CliError::WriteImage { path, message } => {
                write!(f, "Failed to write image {}: {}", path.display(), message)
            }
            CliError::NotCached(key) => write!(f, "Not cached: {}", key),
            CliError::Logging(msg) => write!(f, "Failed to initialise logging: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
