//! Configuration commands.

use clap::Subcommand;
use imagecache::config::{config_file_path, format_duration, format_size, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective settings
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => {
            print!("{}", render(config));
            Ok(())
        }
    }
}

fn run_path() -> Result<(), CliError> {
    let path = config_file_path()
        .ok_or_else(|| CliError::Config("Cannot determine home directory".to_string()))?;
    println!("{}", path.display());
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    let cache = &config.cache;
    format!(
        "[cache]\n  directory = {}\n  namespace = {}\n  ttl = {}\n  disk_size = {}\n  memory_size = {}\n  naming = {:?}\n",
        cache.directory.display(),
        cache.config.namespace,
        format_duration(cache.config.time_to_live),
        format_size(cache.config.max_disk_bytes),
        format_size(cache.memory_size),
        cache.naming,
    )
}
