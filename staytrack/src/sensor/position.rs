//! Position source contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SensorError;
use crate::geo::Coordinate;
use crate::model::LocationSample;

/// Location authorization granted by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Access granted while the app is in use.
    WhenInUse,
    /// Access granted at all times, including background.
    Always,
    /// The user refused access.
    Denied,
    /// Access is blocked by policy (parental controls, MDM).
    Restricted,
}

impl AuthorizationState {
    /// Whether sampling may start under this state.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::WhenInUse | Self::Always)
    }

    /// Whether the user or policy has refused access.
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "not determined"),
            Self::WhenInUse => write!(f, "when in use"),
            Self::Always => write!(f, "always"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

/// A circular stay-region armed around the last known position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Center of the region.
    pub center: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
    /// Deliver an event when the subject leaves the region.
    pub notify_on_exit: bool,
    /// Deliver an event when the subject enters the region.
    pub notify_on_entry: bool,
}

impl Geofence {
    /// Exit-only stay-region, the only kind the mode controller arms.
    pub fn stay_region(center: Coordinate, radius_m: f64) -> Self {
        Self {
            center,
            radius_m,
            notify_on_exit: true,
            notify_on_entry: false,
        }
    }

    /// Whether `point` lies inside the region (boundary counts as inside).
    pub fn contains(&self, point: &Coordinate) -> bool {
        self.center.distance_to(point) <= self.radius_m
    }
}

/// Events delivered by a position source, in timestamp order.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A raw position fix (not yet accepted).
    Sample(LocationSample),
    /// The sensor reported a failure.
    Error(SensorError),
    /// The subject left the armed geofence.
    GeofenceExited {
        /// Center of the region that was exited.
        center: Coordinate,
        /// When the exit was detected.
        at: DateTime<Utc>,
    },
    /// The user changed location authorization.
    AuthorizationChanged(AuthorizationState),
}

/// Commands the engine issues to the underlying sensor.
///
/// Implementations wrap the platform API. All methods are expected to be
/// cheap and non-blocking; results arrive later as [`PositionEvent`]s.
/// Calling a stop method while nothing is running must be harmless.
pub trait PositionSource: Send + Sync {
    /// Current authorization state.
    fn authorization(&self) -> AuthorizationState;

    /// Ask the user for authorization. The answer arrives as
    /// [`PositionEvent::AuthorizationChanged`].
    fn request_authorization(&self);

    /// Begin high-frequency acquisition.
    fn start_continuous(&self);

    /// End high-frequency acquisition.
    fn stop_continuous(&self);

    /// Begin low-power significant-change monitoring.
    fn start_significant_change_only(&self);

    /// End significant-change monitoring.
    fn stop_significant_change(&self);

    /// Arm a geofence, replacing any previously armed one.
    fn arm_geofence(&self, geofence: &Geofence) -> Result<(), SensorError>;

    /// Remove the armed geofence, if any.
    fn disarm_geofence(&self);

    /// Stop every kind of monitoring.
    fn stop_all(&self);
}
