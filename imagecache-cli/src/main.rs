//! imagecache - inspect and maintain an image cache directory.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use imagecache::config::ConfigFile;
use imagecache::logging::init_logging;
use tracing::debug;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "imagecache", version = imagecache::VERSION, about)]
struct Cli {
    /// Configuration file (defaults to ~/.imagecache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache namespace
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(flatten)]
    Cache(CacheAction),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let filter = if cli.verbose { "imagecache=debug" } else { "warn" };
    let _logging = init_logging(filter, None).map_err(|e| CliError::Logging(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    if let Some(namespace) = cli.namespace {
        config.cache.config.namespace = namespace;
    }
    debug!(
        directory = %config.cache.directory.display(),
        namespace = %config.cache.config.namespace,
        "Loaded configuration"
    );

    match cli.command {
        Commands::Config { command } => commands::config::run(command, &config),
        Commands::Cache(action) => {
            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            runtime.block_on(commands::cache::run(action, &config))
        }
    }
}
