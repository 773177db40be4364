//! Logging initialisation.
//!
//! Installs a `tracing` subscriber writing human-readable records to stderr
//! and, optionally, to a daily-rolling file. The filter comes from
//! `RUST_LOG` when set, otherwise from the supplied default directive.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Log file name prefix inside the log directory.
pub const LOG_FILE_NAME: &str = "imagecache.log";

/// Keeps the background log writer alive. Drop it last to flush.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Arguments
///
/// * `default_filter` - Directive used when `RUST_LOG` is unset, e.g. `"info"`
/// * `log_dir` - Directory for rolling log files; `None` logs to stderr only
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(
    default_filter: &str,
    log_dir: Option<&Path>,
) -> Result<LoggingGuard, TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard { _file: file_guard })
}
