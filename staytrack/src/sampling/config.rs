//! Tuning parameters for the acceptance gate and the mode controller.

use std::time::Duration;

/// Configuration for the sample acceptance gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    /// Samples less accurate than this (meters) are rejected.
    pub max_horizontal_accuracy_m: f64,

    /// Speed above which the fast tier applies (m/s).
    pub fast_speed_mps: f64,

    /// Displacement above which the fast tier applies (meters).
    pub fast_displacement_m: f64,

    /// Speed above which the moderate tier applies (m/s).
    pub moderate_speed_mps: f64,

    /// Displacement above which the moderate tier applies (meters).
    pub moderate_displacement_m: f64,

    /// Minimum interval between accepted samples in the fast tier.
    pub fast_interval: Duration,

    /// Minimum interval between accepted samples in the moderate tier.
    pub moderate_interval: Duration,

    /// Minimum interval between accepted samples while stationary.
    pub stationary_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy_m: 100.0,
            fast_speed_mps: 5.0,
            fast_displacement_m: 100.0,
            moderate_speed_mps: 1.5,
            moderate_displacement_m: 30.0,
            fast_interval: Duration::from_secs(30),
            moderate_interval: Duration::from_secs(90),
            stationary_interval: Duration::from_secs(300),
        }
    }
}

/// Configuration for the sampling mode controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeControllerConfig {
    /// Maximum speed (m/s) for a sample to count as stationary.
    pub stationary_speed_mps: f64,

    /// Maximum displacement (meters) from the previous accepted sample
    /// for a sample to count as stationary.
    pub stationary_displacement_m: f64,

    /// Radius of the stay-region armed on entering low-power mode (meters).
    pub geofence_radius_m: f64,

    /// Length of the window passed to the activity classifier.
    pub activity_window: Duration,
}

impl Default for ModeControllerConfig {
    fn default() -> Self {
        Self {
            stationary_speed_mps: 1.5,
            stationary_displacement_m: 30.0,
            geofence_radius_m: 120.0,
            activity_window: Duration::from_secs(30),
        }
    }
}
