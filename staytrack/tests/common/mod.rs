//! Mock collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use staytrack::config::EngineConfig;
use staytrack::engine::{EngineUpdate, SamplingEngine};
use staytrack::error::{ResolutionError, SensorError};
use staytrack::geocode::{GeocodeConfig, GeocodeProvider, GeocodeResolver};
use staytrack::sensor::{
    ActivityClassifier, ActivityKind, ActivityReport, AuthorizationState, Geofence, PositionSource,
};
use staytrack::store::MemoryStore;
use staytrack::{Address, BoxFuture, Coordinate, LocationSample};

// ============================================================================
// Position source
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestAuthorization,
    StartContinuous,
    StopContinuous,
    StartSignificantChange,
    StopSignificantChange,
    Arm(Geofence),
    Disarm,
    StopAll,
}

pub struct MockSource {
    authorization: Mutex<AuthorizationState>,
    commands: Mutex<Vec<Command>>,
    armed: Mutex<Option<Geofence>>,
}

impl MockSource {
    pub fn new(authorization: AuthorizationState) -> Self {
        Self {
            authorization: Mutex::new(authorization),
            commands: Mutex::new(Vec::new()),
            armed: Mutex::new(None),
        }
    }

    pub fn set_authorization(&self, state: AuthorizationState) {
        *self.authorization.lock() = state;
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    pub fn armed(&self) -> Option<Geofence> {
        *self.armed.lock()
    }

    fn record(&self, command: Command) {
        self.commands.lock().push(command);
    }
}

impl PositionSource for MockSource {
    fn authorization(&self) -> AuthorizationState {
        *self.authorization.lock()
    }

    fn request_authorization(&self) {
        self.record(Command::RequestAuthorization);
    }

    fn start_continuous(&self) {
        self.record(Command::StartContinuous);
    }

    fn stop_continuous(&self) {
        self.record(Command::StopContinuous);
    }

    fn start_significant_change_only(&self) {
        self.record(Command::StartSignificantChange);
    }

    fn stop_significant_change(&self) {
        self.record(Command::StopSignificantChange);
    }

    fn arm_geofence(&self, geofence: &Geofence) -> Result<(), SensorError> {
        self.record(Command::Arm(*geofence));
        *self.armed.lock() = Some(*geofence);
        Ok(())
    }

    fn disarm_geofence(&self) {
        self.record(Command::Disarm);
        *self.armed.lock() = None;
    }

    fn stop_all(&self) {
        self.record(Command::StopAll);
        *self.armed.lock() = None;
    }
}

// ============================================================================
// Activity classifier
// ============================================================================

pub struct MockClassifier {
    script: Mutex<VecDeque<ActivityReport>>,
    fallback: ActivityReport,
    queries: AtomicUsize,
}

impl MockClassifier {
    pub fn always(kind: ActivityKind) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ActivityReport::Classified(kind),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, kind: ActivityKind) {
        self.script.lock().push_back(ActivityReport::Classified(kind));
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ActivityClassifier for MockClassifier {
    fn classify(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> BoxFuture<'_, ActivityReport> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let report = self.script.lock().pop_front().unwrap_or(self.fallback);
        Box::pin(async move { report })
    }
}

// ============================================================================
// Geocoder
// ============================================================================

pub struct MockGeocoder {
    result: Mutex<Result<Address, ResolutionError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockGeocoder {
    pub fn returning(address: Address) -> Self {
        Self {
            result: Mutex::new(Ok(address)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Mutex::new(Err(ResolutionError::ProviderFailure(
                "service unavailable".to_string(),
            ))),
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

impl GeocodeProvider for MockGeocoder {
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

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: SamplingEngine,
    pub source: Arc<MockSource>,
    pub classifier: Arc<MockClassifier>,
    pub geocoder: Arc<MockGeocoder>,
    pub resolver: Arc<GeocodeResolver>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(authorization: AuthorizationState, classifier: MockClassifier) -> Self {
        Self::with_geocoder(
            authorization,
            classifier,
            MockGeocoder::returning(office_address()),
        )
    }

    pub fn with_geocoder(
        authorization: AuthorizationState,
        classifier: MockClassifier,
        geocoder: MockGeocoder,
    ) -> Self {
        let source = Arc::new(MockSource::new(authorization));
        let classifier = Arc::new(classifier);
        let geocoder = Arc::new(geocoder);
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(GeocodeResolver::new(
            GeocodeConfig::default(),
            geocoder.clone(),
        ));

        let engine = SamplingEngine::new(
            EngineConfig::default(),
            source.clone(),
            classifier.clone(),
            store.clone(),
            resolver.clone(),
        );

        Self {
            engine,
            source,
            classifier,
            geocoder,
            resolver,
            store,
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Office location in Lyon.
pub fn office() -> Coordinate {
    Coordinate::new(45.7640, 4.8357)
}

pub fn office_address() -> Address {
    Address {
        name: Some("Atelier".to_string()),
        street: Some("Rue de la République".to_string()),
        city: Some("Lyon".to_string()),
        state: Some("Auvergne-Rhône-Alpes".to_string()),
        country: Some("France".to_string()),
        postal_code: Some("69002".to_string()),
    }
}

pub fn fix(secs: i64, position: Coordinate, speed: f64) -> LocationSample {
    LocationSample::new(at(secs), position, 10.0, speed)
}

/// Drain every update currently buffered on `rx`.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<EngineUpdate>) -> Vec<EngineUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}
