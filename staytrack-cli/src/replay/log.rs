//! Recorded position log format (JSON lines).
//!
//! ```text
//! {"type":"sample","timestamp":"2024-05-01T08:00:00Z","latitude":45.764,"longitude":4.8357,"horizontal_accuracy":8,"speed":0}
//! {"type":"activity","timestamp":"2024-05-01T08:00:00Z","kind":"stationary"}
//! {"type":"authorization","state":"denied"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use staytrack::sensor::{ActivityKind, AuthorizationState};
use staytrack::LocationSample;

use crate::error::CliError;

/// One line of a replay log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogRecord {
    /// A raw sensor fix.
    Sample(LocationSample),
    /// Motion annotation consumed by the replay classifier.
    Activity {
        timestamp: DateTime<Utc>,
        kind: ActivityKind,
    },
    /// The user changed location permission.
    Authorization { state: AuthorizationState },
}

/// Parse a whole log file.
pub fn read_log(path: &Path) -> Result<Vec<LogRecord>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|error| CliError::FileRead {
        path: path.to_path_buf(),
        error,
    })?;
    parse_log(&content).map_err(|(line, message)| CliError::InvalidRecord {
        path: path.to_path_buf(),
        line,
        message,
    })
}

/// Parse log content, returning the 1-based line number on failure.
pub fn parse_log(content: &str) -> Result<Vec<LogRecord>, (usize, String)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| (index + 1, e.to_string()))
        })
        .collect()
}
