//! TileLayer CLI - build and inspect tile pyramids from the command line.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilelayer::config::{config_directory, ConfigFile};
use tilelayer::logging::init_logging;
use tracing::warn;

use commands::config::ConfigCommands;
use commands::key::KeyArgs;
use commands::tiles::TilesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilelayer")]
#[command(version, about = "Build and inspect multi-resolution tile pyramids", long_about = None)]
struct Cli {
    /// Log directory (default: [logging] directory, then ~/.tilelayer)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a layer's tile pyramid and list the published tiles
    Tiles(TilesArgs),

    /// Show the bounds and children of a tile
    Key(KeyArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, config_error) = match ConfigFile::load() {
        Ok(config) => (config, None),
        Err(e) => (ConfigFile::default(), Some(e)),
    };

    let log_dir = cli
        .log_dir
        .or_else(|| config.logging.directory.clone())
        .unwrap_or_else(config_directory);
    let _logging_guard = match init_logging(&log_dir, &config.logging.file) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    if let (Some(e), false) = (&config_error, matches!(cli.command, Commands::Config(_))) {
        warn!(error = %e, "Ignoring unreadable config file, using defaults");
    }

    let result = match cli.command {
        Commands::Tiles(args) => commands::tiles::run(args, &config).await,
        Commands::Key(args) => commands::key::run(args),
        Commands::Config(command) => commands::config::run(command, config_error),
    };

    if let Err(e) = result {
        e.exit();
    }
}
