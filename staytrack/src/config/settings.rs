//! Settings held by the config file.

use std::path::PathBuf;

use super::file::config_directory;
use super::EngineConfig;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "staytrack.log";

/// Where log output goes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub engine: EngineConfig,
    pub logging: LoggingSettings,
}
