//! Sensor acquisition modes.

use serde::{Deserialize, Serialize};

/// Acquisition mode of the position sensor.
///
/// Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// High-frequency acquisition while the subject moves.
    #[default]
    Continuous,

    /// Low-power coarse monitoring without a stay-region.
    ///
    /// Only held when arming the geofence failed.
    SignificantChangeOnly,

    /// Low-power monitoring with an exit-only stay-region armed.
    Geofenced,
}

impl SamplingMode {
    /// Whether high-frequency acquisition is switched off.
    pub fn is_low_power(&self) -> bool {
        !matches!(self, SamplingMode::Continuous)
    }

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            SamplingMode::Continuous => "continuous updates",
            SamplingMode::SignificantChangeOnly => "significant-change monitoring",
            SamplingMode::Geofenced => "significant-change monitoring with stay-region",
        }
    }
}

impl std::fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingMode::Continuous => write!(f, "continuous"),
            SamplingMode::SignificantChangeOnly => write!(f, "significant-change"),
            SamplingMode::Geofenced => write!(f, "geofenced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_continuous() {
        assert_eq!(SamplingMode::default(), SamplingMode::Continuous);
        assert!(!SamplingMode::Continuous.is_low_power());
    }

    #[test]
    fn test_low_power_modes() {
        assert!(SamplingMode::SignificantChangeOnly.is_low_power());
        assert!(SamplingMode::Geofenced.is_low_power());
    }

    #[test]
    fn test_display() {
        assert_eq!(SamplingMode::Continuous.to_string(), "continuous");
        assert_eq!(
            SamplingMode::SignificantChangeOnly.to_string(),
            "significant-change"
        );
        assert_eq!(SamplingMode::Geofenced.to_string(), "geofenced");
    }
}
