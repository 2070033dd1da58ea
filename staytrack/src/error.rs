//! Error types shared across the engine.
//!
//! None of these are fatal to the engine: sensor errors change the tracking
//! status, resolution errors leave a place unresolved, and persistence
//! errors roll the store back while the in-memory state is kept.

use thiserror::Error;

/// Errors reported by the position sensor or raised by the acceptance gate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SensorError {
    /// The user has not authorized location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// A sample's horizontal accuracy is outside the accepted range.
    #[error("Horizontal accuracy {accuracy}m outside accepted range")]
    LowAccuracy { accuracy: f64 },

    /// The sensor could not determine its accuracy.
    #[error("Location accuracy unavailable")]
    AccuracyUnavailable,

    /// Temporary sensor failure; the next event may succeed.
    #[error("Transient sensor error: {0}")]
    Transient(String),

    /// The sensor refused to arm a geofence.
    #[error("Geofence unavailable: {0}")]
    GeofenceUnavailable(String),
}

/// Errors from reverse geocoding.
///
/// `Clone` so that one provider failure can be delivered to every
/// resolution that joined the same in-flight lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// The provider failed (network, quota, timeout).
    #[error("Geocode provider failure: {0}")]
    ProviderFailure(String),

    /// The provider answered but had no address for the coordinate.
    #[error("No address found for coordinate")]
    NoResult,
}

/// Errors from the durable store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// A save did not complete; the store must be rolled back.
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_error_display() {
        let err = SensorError::LowAccuracy { accuracy: 150.0 };
        assert!(err.to_string().contains("150"));
        assert_eq!(
            SensorError::PermissionDenied.to_string(),
            "Location permission denied"
        );
    }

    #[test]
    fn test_resolution_error_display() {
        let err = ResolutionError::ProviderFailure("timeout".to_string());
        assert_eq!(err.to_string(), "Geocode provider failure: timeout");
        assert_eq!(
            ResolutionError::NoResult.to_string(),
            "No address found for coordinate"
        );
    }

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::SaveFailed("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }
}
