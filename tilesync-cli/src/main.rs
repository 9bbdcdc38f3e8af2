//! TileSync CLI - Command-line interface
//!
//! Runs single synchronization cycles or the recurring scheduler, and edits
//! the configuration and stored credentials used by the library.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tilesync::config::ConfigFile;
use tilesync::coord::BoundingBox;
use tilesync::logging::init_logging;

use commands::config::ConfigCommands;
use commands::token::TokenCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilesync", version = tilesync::VERSION, about)]
struct Cli {
    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one synchronization cycle and exit
    Sync {
        /// Area to synchronize as south,west,north,east (repeatable).
        /// Replaces area.boxes from the config file.
        #[arg(long = "box", value_name = "S,W,N,E", allow_hyphen_values = true)]
        boxes: Vec<BoundingBox>,
    },

    /// Synchronize on the configured interval until interrupted
    Run {
        /// Area to synchronize as south,west,north,east (repeatable)
        #[arg(long = "box", value_name = "S,W,N,E", allow_hyphen_values = true)]
        boxes: Vec<BoundingBox>,
    },

    /// List the tiles covered by bounding boxes
    Tiles {
        /// Bounding box as south,west,north,east (repeatable)
        #[arg(long = "box", value_name = "S,W,N,E", allow_hyphen_values = true)]
        boxes: Vec<BoundingBox>,
    },

    /// Show local cache contents per tile
    Status,

    /// Manage the stored bearer token
    #[command(subcommand)]
    Token(TokenCommands),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = ConfigFile::load().unwrap_or_default().to_log_config();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Sync { boxes } => commands::sync::run(boxes),
        Commands::Run { boxes } => commands::run::run(boxes),
        Commands::Tiles { boxes } => commands::tiles::run(&boxes),
        Commands::Status => commands::status::run(),
        Commands::Token(command) => commands::token::run(command),
        Commands::Config(command) => commands::config::run(command),
    }
}
