//! Engine configuration and the user config file.
//!
//! [`EngineConfig`] groups the tuning of every component. [`ConfigFile`]
//! maps it to `~/.staytrack/config.ini`; missing keys keep their defaults.
//!
//! # Example
//!
//! ```
//! use staytrack::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.controller.geofence_radius_m, 120.0);
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, LoggingSettings};

use crate::clustering::ClusteringConfig;
use crate::engine::SweeperConfig;
use crate::geocode::GeocodeConfig;
use crate::sampling::{GateConfig, ModeControllerConfig};

/// Tuning for every engine component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub gate: GateConfig,
    pub controller: ModeControllerConfig,
    pub clustering: ClusteringConfig,
    pub geocode: GeocodeConfig,
    pub sweeper: SweeperConfig,
}
