//! Sampling mode controller.
//!
//! Decides the sensor acquisition mode from stationarity of the latest
//! accepted sample and the activity classifier's answer, and drives the
//! [`PositionSource`] accordingly.
//!
//! # Debounce
//!
//! Every activity query is numbered. A result is applied at most once, a
//! result older than the newest applied one is dropped, and a result that
//! asks for the current mode does nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::geo::Coordinate;
use crate::model::LocationSample;
use crate::sensor::{ActivityReport, Geofence, PositionSource};

use super::config::ModeControllerConfig;
use super::mode::SamplingMode;

/// Why a mode transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Latest sample stationary and classifier reported no motion.
    Stationary,
    /// The stay-region geofence reported an exit.
    GeofenceExit,
    /// The classifier reported ambulatory or vehicular motion.
    MotionDetected,
}

impl std::fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionReason::Stationary => write!(f, "stationary"),
            TransitionReason::GeofenceExit => write!(f, "geofence exit"),
            TransitionReason::MotionDetected => write!(f, "motion detected"),
        }
    }
}

/// A completed mode change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTransition {
    pub from: SamplingMode,
    pub to: SamplingMode,
    pub reason: TransitionReason,
    /// Stay-region armed by this transition, if any.
    pub geofence: Option<Geofence>,
}

/// A pending classifier query issued by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Sequence number, increasing per controller.
    pub id: u64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Switches the position source between continuous and low-power modes.
pub struct SamplingModeController {
    config: ModeControllerConfig,
    source: Arc<dyn PositionSource>,
    mode: SamplingMode,
    geofence: Option<Geofence>,
    active: bool,
    last_accepted: Option<LocationSample>,
    last_accepted_stationary: bool,
    next_query_id: u64,
    last_applied_query: Option<u64>,
}

impl std::fmt::Debug for SamplingModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingModeController")
            .field("mode", &self.mode)
            .field("geofence", &self.geofence)
            .field("active", &self.active)
            .field("last_accepted_stationary", &self.last_accepted_stationary)
            .finish_non_exhaustive()
    }
}

impl SamplingModeController {
    /// Create an inactive controller in `Continuous` mode.
    pub fn new(config: ModeControllerConfig, source: Arc<dyn PositionSource>) -> Self {
        Self {
            config,
            source,
            mode: SamplingMode::Continuous,
            geofence: None,
            active: false,
            last_accepted: None,
            last_accepted_stationary: false,
            next_query_id: 0,
            last_applied_query: None,
        }
    }

    /// Current acquisition mode.
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Currently armed stay-region.
    pub fn geofence(&self) -> Option<&Geofence> {
        self.geofence.as_ref()
    }

    /// Whether the controller is driving the source.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start driving the source in continuous mode.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.mode = SamplingMode::Continuous;
        self.source.start_continuous();
        tracing::info!(mode = %self.mode, "Sampling started");
    }

    /// Stop all monitoring and disarm the geofence.
    ///
    /// Safe to call repeatedly. After this, geofence and activity inputs
    /// are ignored until [`activate`](Self::activate) is called again.
    pub fn deactivate(&mut self) {
        if self.geofence.take().is_some() {
            self.source.disarm_geofence();
        }
        self.source.stop_all();

        if self.active {
            tracing::info!(from = %self.mode, "Sampling stopped");
        }
        self.active = false;
        self.mode = SamplingMode::Continuous;
        self.last_accepted = None;
        self.last_accepted_stationary = false;
        // Results for queries issued before this point are stale
        self.last_applied_query = self.next_query_id.checked_sub(1);
    }

    /// Record an accepted sample and its displacement from the previous one.
    pub fn observe_accepted(&mut self, sample: &LocationSample, displacement_m: f64) {
        self.last_accepted_stationary = sample.known_speed() <= self.config.stationary_speed_mps
            && displacement_m <= self.config.stationary_displacement_m;
        self.last_accepted = Some(*sample);
    }

    /// Whether the latest accepted sample counted as stationary.
    pub fn is_stationary(&self) -> bool {
        self.last_accepted.is_some() && self.last_accepted_stationary
    }

    /// Allocate a classifier query for the window ending at `at`.
    pub fn begin_activity_query(&mut self, at: DateTime<Utc>) -> ActivityQuery {
        let id = self.next_query_id;
        self.next_query_id += 1;
        let window = chrono::Duration::from_std(self.config.activity_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        ActivityQuery {
            id,
            window_start: at - window,
            window_end: at,
        }
    }

    /// Apply a classifier result.
    ///
    /// Returns the transition performed, if any.
    pub fn on_activity(&mut self, query_id: u64, report: ActivityReport) -> Option<ModeTransition> {
        if !self.active {
            return None;
        }
        if self.last_applied_query.is_some_and(|last| query_id <= last) {
            tracing::debug!(query_id, "Ignoring stale activity result");
            return None;
        }
        self.last_applied_query = Some(query_id);

        match self.mode {
            SamplingMode::Continuous => {
                if report.indicates_motion() || !self.is_stationary() {
                    return None;
                }
                let center = self.last_accepted.as_ref()?.coordinate();
                Some(self.enter_low_power(center, TransitionReason::Stationary))
            }
            SamplingMode::SignificantChangeOnly | SamplingMode::Geofenced => {
                if !report.indicates_motion() {
                    return None;
                }
                Some(self.enter_continuous(TransitionReason::MotionDetected))
            }
        }
    }

    /// Apply a geofence exit event.
    ///
    /// Exits from a region other than the armed one are ignored.
    pub fn on_geofence_exit(&mut self, center: &Coordinate) -> Option<ModeTransition> {
        if !self.active || !self.mode.is_low_power() {
            return None;
        }
        if let Some(armed) = &self.geofence {
            if armed.center.distance_to(center) > 1.0 {
                tracing::debug!(%center, "Ignoring exit from a region that is not armed");
                return None;
            }
        }
        Some(self.enter_continuous(TransitionReason::GeofenceExit))
    }

    fn enter_low_power(&mut self, center: Coordinate, reason: TransitionReason) -> ModeTransition {
        let from = self.mode;
        self.source.stop_continuous();
        self.source.start_significant_change_only();

        let fence = Geofence::stay_region(center, self.config.geofence_radius_m);
        match self.source.arm_geofence(&fence) {
            Ok(()) => {
                self.geofence = Some(fence);
                self.mode = SamplingMode::Geofenced;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to arm stay-region, continuing without it");
                self.geofence = None;
                self.mode = SamplingMode::SignificantChangeOnly;
            }
        }

        tracing::info!(
            from = %from,
            to = %self.mode,
            reason = %reason,
            center = %center,
            radius_m = self.config.geofence_radius_m,
            "Sampling mode transition"
        );

        ModeTransition {
            from,
            to: self.mode,
            reason,
            geofence: self.geofence,
        }
    }

    fn enter_continuous(&mut self, reason: TransitionReason) -> ModeTransition {
        let from = self.mode;
        if self.geofence.take().is_some() {
            self.source.disarm_geofence();
        }
        self.source.stop_significant_change();
        self.source.start_continuous();
        self.mode = SamplingMode::Continuous;

        tracing::info!(
            from = %from,
            to = %self.mode,
            reason = %reason,
            "Sampling mode transition"
        );

        ModeTransition {
            from,
            to: self.mode,
            reason,
            geofence: None,
        }
    }
}
