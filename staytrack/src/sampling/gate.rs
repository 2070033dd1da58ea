//! Sample acceptance gate.
//!
//! Filters raw sensor fixes before they reach the clusterer. Rejects
//! inaccurate fixes outright and rate-limits the rest with a minimum
//! interval chosen from a speed/displacement tier table.
//!
//! Displacement and elapsed time are measured against the last *accepted*
//! sample. Rate-limited samples never move that baseline.

use std::time::Duration;

use crate::model::LocationSample;

use super::config::GateConfig;

/// Outcome of evaluating one raw sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// The sample passes and becomes the new baseline.
    Accepted {
        /// Distance from the previous accepted sample (0 for the first).
        displacement_m: f64,
        /// Tier interval that applied.
        min_interval: Duration,
    },

    /// Horizontal accuracy outside `[0, max_horizontal_accuracy_m]`.
    LowAccuracy {
        /// The offending accuracy value.
        accuracy: f64,
    },

    /// Arrived sooner than the tier interval allows.
    RateLimited {
        /// Distance from the last accepted sample.
        displacement_m: f64,
        /// Tier interval that applied.
        min_interval: Duration,
        /// Time since the last accepted sample.
        elapsed: Duration,
    },
}

impl GateDecision {
    /// Whether the sample was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted { .. })
    }

    /// Whether this decision should be followed by an activity query.
    ///
    /// Accepted and rate-limited samples both count; inaccurate ones do not.
    pub fn triggers_activity_query(&self) -> bool {
        !matches!(self, GateDecision::LowAccuracy { .. })
    }
}

/// Accuracy filter and tiered rate limiter.
#[derive(Debug)]
pub struct AcceptanceGate {
    config: GateConfig,
    last_accepted: Option<LocationSample>,
}

impl Default for AcceptanceGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl AcceptanceGate {
    /// Create a gate with the given configuration.
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_accepted: None,
        }
    }

    /// Evaluate a raw sample, updating the baseline if it is accepted.
    pub fn evaluate(&mut self, sample: &LocationSample) -> GateDecision {
        let accuracy = sample.horizontal_accuracy;
        if !(0.0..=self.config.max_horizontal_accuracy_m).contains(&accuracy) {
            tracing::debug!(accuracy, "Sample rejected: low accuracy");
            return GateDecision::LowAccuracy { accuracy };
        }

        let Some(last) = self.last_accepted else {
            let min_interval = self.min_interval_for(sample.known_speed(), 0.0);
            self.last_accepted = Some(*sample);
            return GateDecision::Accepted {
                displacement_m: 0.0,
                min_interval,
            };
        };

        let displacement_m = last.coordinate().distance_to(&sample.coordinate());
        let min_interval = self.min_interval_for(sample.known_speed(), displacement_m);
        let elapsed = (sample.timestamp - last.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if elapsed < min_interval {
            tracing::debug!(
                elapsed_s = elapsed.as_secs_f64(),
                min_interval_s = min_interval.as_secs(),
                displacement_m,
                "Sample rejected: rate limited"
            );
            return GateDecision::RateLimited {
                displacement_m,
                min_interval,
                elapsed,
            };
        }

        self.last_accepted = Some(*sample);
        GateDecision::Accepted {
            displacement_m,
            min_interval,
        }
    }

    /// Minimum interval for the tier matching `speed_mps` and `displacement_m`.
    pub fn min_interval_for(&self, speed_mps: f64, displacement_m: f64) -> Duration {
        let c = &self.config;
        if speed_mps > c.fast_speed_mps || displacement_m > c.fast_displacement_m {
            c.fast_interval
        } else if speed_mps > c.moderate_speed_mps || displacement_m > c.moderate_displacement_m {
            c.moderate_interval
        } else {
            c.stationary_interval
        }
    }

    /// The current baseline sample.
    pub fn last_accepted(&self) -> Option<&LocationSample> {
        self.last_accepted.as_ref()
    }

    /// Forget the baseline; the next sample is evaluated as a first sample.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
