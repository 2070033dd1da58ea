//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::path::PathBuf;
use std::process;

use staytrack::config::ConfigFileError;
use thiserror::Error;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Failed to read an input file
    #[error("Failed to read '{}': {error}", .path.display())]
    FileRead {
        path: PathBuf,
        error: std::io::Error,
    },

    /// A replay log line could not be parsed
    #[error("{}:{line}: {message}", .path.display())]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The address fixture file could not be parsed
    #[error("Invalid address fixtures in '{}': {error}", .path.display())]
    InvalidFixtures {
        path: PathBuf,
        error: serde_json::Error,
    },

    /// Refused to overwrite an existing file
    #[error("'{}' already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    /// Failed to start the async runtime
    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),

    /// Failed to serialize output
    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::InvalidRecord { .. } = self {
            eprintln!();
            eprintln!("Each line must be a JSON object with a \"type\" field, for example:");
            eprintln!(
                "  {{\"type\":\"sample\",\"timestamp\":\"2024-05-01T08:00:00Z\",\
                 \"latitude\":45.764,\"longitude\":4.8357,\"horizontal_accuracy\":8,\"speed\":0}}"
            );
            eprintln!(
                "  {{\"type\":\"activity\",\"timestamp\":\"2024-05-01T08:00:00Z\",\
                 \"kind\":\"stationary\"}}"
            );
        }

        process::exit(1)
    }
}
