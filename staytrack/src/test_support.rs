//! Recording collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{ResolutionError, SensorError};
use crate::geo::Coordinate;
use crate::geocode::GeocodeProvider;
use crate::model::Address;
use crate::sensor::{ActivityClassifier, ActivityReport, AuthorizationState, Geofence, PositionSource};
use crate::BoxFuture;

/// A command received by [`RecordingSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCommand {
    RequestAuthorization,
    StartContinuous,
    StopContinuous,
    StartSignificantChange,
    StopSignificantChange,
    ArmGeofence(Geofence),
    DisarmGeofence,
    StopAll,
}

/// Position source that records every command it receives.
pub struct RecordingSource {
    authorization: Mutex<AuthorizationState>,
    commands: Mutex<Vec<SourceCommand>>,
    armed: Mutex<Option<Geofence>>,
    fail_geofence: Mutex<bool>,
}

impl RecordingSource {
    pub fn new(authorization: AuthorizationState) -> Self {
        Self {
            authorization: Mutex::new(authorization),
            commands: Mutex::new(Vec::new()),
            armed: Mutex::new(None),
            fail_geofence: Mutex::new(false),
        }
    }

    pub fn authorized() -> Self {
        Self::new(AuthorizationState::Always)
    }

    pub fn set_authorization(&self, state: AuthorizationState) {
        *self.authorization.lock() = state;
    }

    pub fn fail_geofence(&self, fail: bool) {
        *self.fail_geofence.lock() = fail;
    }

    pub fn commands(&self) -> Vec<SourceCommand> {
        self.commands.lock().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }

    pub fn armed_geofence(&self) -> Option<Geofence> {
        *self.armed.lock()
    }

    fn record(&self, command: SourceCommand) {
        self.commands.lock().push(command);
    }
}

impl PositionSource for RecordingSource {
    fn authorization(&self) -> AuthorizationState {
        *self.authorization.lock()
    }

    fn request_authorization(&self) {
        self.record(SourceCommand::RequestAuthorization);
    }

    fn start_continuous(&self) {
        self.record(SourceCommand::StartContinuous);
    }

    fn stop_continuous(&self) {
        self.record(SourceCommand::StopContinuous);
    }

    fn start_significant_change_only(&self) {
        self.record(SourceCommand::StartSignificantChange);
    }

    fn stop_significant_change(&self) {
        self.record(SourceCommand::StopSignificantChange);
    }

    fn arm_geofence(&self, geofence: &Geofence) -> Result<(), SensorError> {
        if *self.fail_geofence.lock() {
            return Err(SensorError::GeofenceUnavailable("monitoring limit reached".to_string()));
        }
        self.record(SourceCommand::ArmGeofence(*geofence));
        *self.armed.lock() = Some(*geofence);
        Ok(())
    }

    fn disarm_geofence(&self) {
        self.record(SourceCommand::DisarmGeofence);
        *self.armed.lock() = None;
    }

    fn stop_all(&self) {
        self.record(SourceCommand::StopAll);
        *self.armed.lock() = None;
    }
}

/// Classifier answering from a queue of scripted reports, then a default.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<ActivityReport>>,
    fallback: ActivityReport,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl ScriptedClassifier {
    pub fn always(report: ActivityReport) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: report,
            windows: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, report: ActivityReport) {
        self.script.lock().push_back(report);
    }

    pub fn query_count(&self) -> usize {
        self.windows.lock().len()
    }
}

impl ActivityClassifier for ScriptedClassifier {
    fn classify(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> BoxFuture<'_, ActivityReport> {
        self.windows.lock().push((window_start, window_end));
        let report = self.script.lock().pop_front().unwrap_or(self.fallback);
        Box::pin(async move { report })
    }
}

/// Geocode provider returning a fixed address and counting calls.
pub struct CountingProvider {
    result: Mutex<Result<Address, ResolutionError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn returning(address: Address) -> Self {
        Self {
            result: Mutex::new(Ok(address)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ResolutionError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_result(&self, result: Result<Address, ResolutionError>) {
        *self.result.lock() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeocodeProvider for CountingProvider {
    fn reverse_geocode(
        &self,
        _coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Address, ResolutionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.result.lock().clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

pub fn home_address() -> Address {
    Address {
        name: Some("Home".to_string()),
        street: Some("Ocean Blvd".to_string()),
        city: Some("Long Beach".to_string()),
        state: Some("CA".to_string()),
        country: Some("United States".to_string()),
        postal_code: Some("90802".to_string()),
    }
}
