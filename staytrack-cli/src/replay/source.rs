//! Position source backed by a recorded log.

use parking_lot::Mutex;

use staytrack::error::SensorError;
use staytrack::sensor::{AuthorizationState, Geofence, PositionEvent, PositionSource};
use staytrack::LocationSample;

/// Sensor state as driven by the engine during a replay.
#[derive(Debug, Default)]
struct SourceState {
    authorization: AuthorizationState,
    continuous: bool,
    significant_change: bool,
    armed: Option<Geofence>,
}

/// Replays recorded fixes and emulates geofence exits.
///
/// The recorded log has no geofence events of its own, so one is
/// synthesized when a fix lands outside the armed stay-region.
#[derive(Debug)]
pub struct ReplaySource {
    state: Mutex<SourceState>,
}

impl ReplaySource {
    pub fn new(authorization: AuthorizationState) -> Self {
        Self {
            state: Mutex::new(SourceState {
                authorization,
                ..Default::default()
            }),
        }
    }

    /// Apply a recorded permission change, returning the event to deliver.
    pub fn set_authorization(&self, state: AuthorizationState) -> PositionEvent {
        self.state.lock().authorization = state;
        PositionEvent::AuthorizationChanged(state)
    }

    /// Events to deliver for one recorded fix, in order.
    pub fn events_for(&self, sample: LocationSample) -> Vec<PositionEvent> {
        let mut events = Vec::with_capacity(2);

        let state = self.state.lock();
        if let Some(fence) = state.armed {
            if fence.notify_on_exit && !fence.contains(&sample.coordinate()) {
                tracing::debug!(
                    center = %fence.center,
                    distance_m = fence.center.distance_to(&sample.coordinate()),
                    "Replayed fix left the stay-region"
                );
                events.push(PositionEvent::GeofenceExited {
                    center: fence.center,
                    at: sample.timestamp,
                });
            }
        }
        drop(state);

        events.push(PositionEvent::Sample(sample));
        events
    }

    /// The stay-region currently armed, if any.
    pub fn armed(&self) -> Option<Geofence> {
        self.state.lock().armed
    }

    /// Whether continuous acquisition is on.
    pub fn is_continuous(&self) -> bool {
        self.state.lock().continuous
    }

    /// Whether significant-change monitoring is on.
    pub fn is_significant_change(&self) -> bool {
        self.state.lock().significant_change
    }
}

impl PositionSource for ReplaySource {
    fn authorization(&self) -> AuthorizationState {
        self.state.lock().authorization
    }

    fn request_authorization(&self) {
        tracing::info!("Authorization requested; waiting for a recorded answer");
    }

    fn start_continuous(&self) {
        self.state.lock().continuous = true;
    }

    fn stop_continuous(&self) {
        self.state.lock().continuous = false;
    }

    fn start_significant_change_only(&self) {
        self.state.lock().significant_change = true;
    }

    fn stop_significant_change(&self) {
        self.state.lock().significant_change = false;
    }

    fn arm_geofence(&self, geofence: &Geofence) -> Result<(), SensorError> {
        self.state.lock().armed = Some(*geofence);
        Ok(())
    }

    fn disarm_geofence(&self) {
        self.state.lock().armed = None;
    }

    fn stop_all(&self) {
        let mut state = self.state.lock();
        state.continuous = false;
        state.significant_change = false;
        state.armed = None;
    }
}
