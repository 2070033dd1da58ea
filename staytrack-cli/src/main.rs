//! StayTrack CLI - Command-line interface
//!
//! Replays recorded position logs through the staytrack engine and manages
//! its configuration file.

mod commands;
mod error;
mod replay;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use staytrack::config::config_file_path;

use commands::config::ConfigCommands;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "staytrack")]
#[command(version, about = "Adaptive location sampling and place extraction", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.staytrack/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded position log through the engine and list the places found
    Replay(ReplayArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args, &config_path),
        Commands::Config(command) => commands::config::run(command, &config_path),
    }
}
