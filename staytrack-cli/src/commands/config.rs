//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show`, and `config path` for working with
//! the engine configuration file.

use std::path::Path;

use clap::Subcommand;
use staytrack::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file populated with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(path, force),
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Path => run_path(path),
    }
}

/// Write the default configuration.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Print the configuration with defaults filled in.
fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// Print the config file path.
fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}
