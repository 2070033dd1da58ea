//! Engine status and published updates.

use crate::error::PersistenceError;
use crate::model::{Place, PlaceId};
use crate::sampling::ModeTransition;

/// Whether the engine is collecting samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    /// Not tracking.
    #[default]
    Idle,
    /// Sensor armed and samples flowing.
    Tracking,
    /// Waiting for the user to answer the permission prompt.
    AwaitingAuthorization,
    /// Location access refused; inert until re-authorized.
    PermissionDenied,
}

impl TrackingStatus {
    /// Whether samples are being processed.
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingStatus::Tracking)
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingStatus::Idle => write!(f, "idle"),
            TrackingStatus::Tracking => write!(f, "tracking"),
            TrackingStatus::AwaitingAuthorization => write!(f, "awaiting authorization"),
            TrackingStatus::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

/// Notification published on the engine's broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    StatusChanged(TrackingStatus),
    ModeChanged(ModeTransition),
    /// A stay was closed and kept.
    PlaceFinalized(Place),
    /// A stay was closed but too short to keep.
    PlaceDiscarded(PlaceId),
    /// A kept stay received its address.
    PlaceResolved(Place),
    PersistenceFailed(PersistenceError),
}
