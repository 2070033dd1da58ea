//! Motion activity classifier contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BoxFuture;

/// Motion class reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Stationary,
    Walking,
    Running,
    Cycling,
    Automotive,
}

impl ActivityKind {
    /// Whether this activity means the subject is moving (ambulatory or vehicular).
    pub fn is_moving(&self) -> bool {
        !matches!(self, ActivityKind::Stationary)
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Stationary => write!(f, "stationary"),
            ActivityKind::Walking => write!(f, "walking"),
            ActivityKind::Running => write!(f, "running"),
            ActivityKind::Cycling => write!(f, "cycling"),
            ActivityKind::Automotive => write!(f, "automotive"),
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stationary" => Ok(ActivityKind::Stationary),
            "walking" => Ok(ActivityKind::Walking),
            "running" => Ok(ActivityKind::Running),
            "cycling" => Ok(ActivityKind::Cycling),
            "automotive" => Ok(ActivityKind::Automotive),
            _ => Err(format!("unknown activity: {}", s)),
        }
    }
}

/// Result of a classification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityReport {
    /// The classifier identified the dominant activity in the window.
    Classified(ActivityKind),
    /// No classification available (no hardware, no data, not authorized).
    Unavailable,
}

impl ActivityReport {
    /// Whether the report indicates ambulatory or vehicular motion.
    ///
    /// `Unavailable` is not motion.
    pub fn indicates_motion(&self) -> bool {
        match self {
            ActivityReport::Classified(kind) => kind.is_moving(),
            ActivityReport::Unavailable => false,
        }
    }
}

impl std::fmt::Display for ActivityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityReport::Classified(kind) => write!(f, "{}", kind),
            ActivityReport::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Answers "what was the subject doing" for a recent time window.
///
/// Queries may be slow; the engine runs each one as a background task and
/// never waits on it before processing the next sample.
pub trait ActivityClassifier: Send + Sync {
    /// Classify the dominant activity in `[window_start, window_end]`.
    fn classify(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> BoxFuture<'_, ActivityReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_kinds() {
        assert!(!ActivityKind::Stationary.is_moving());
        assert!(ActivityKind::Walking.is_moving());
        assert!(ActivityKind::Running.is_moving());
        assert!(ActivityKind::Cycling.is_moving());
        assert!(ActivityKind::Automotive.is_moving());
    }

    #[test]
    fn test_unavailable_is_not_motion() {
        assert!(!ActivityReport::Unavailable.indicates_motion());
        assert!(!ActivityReport::Classified(ActivityKind::Stationary).indicates_motion());
        assert!(ActivityReport::Classified(ActivityKind::Automotive).indicates_motion());
    }

    #[test]
    fn test_parse_activity_kind() {
        assert_eq!("Walking".parse::<ActivityKind>(), Ok(ActivityKind::Walking));
        assert_eq!(
            "automotive".parse::<ActivityKind>(),
            Ok(ActivityKind::Automotive)
        );
        assert!("flying".parse::<ActivityKind>().is_err());
    }
}
