//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, show, path)
//! - [`replay`] - Run a recorded position log through the engine

pub mod config;
pub mod replay;
