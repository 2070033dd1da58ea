//! Event-driven orchestrator wiring gate, controller, clusterer and store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::clustering::{Finalization, IngestOutcome, StayClusterer};
use crate::config::EngineConfig;
use crate::error::SensorError;
use crate::geo::Coordinate;
use crate::geocode::{GeocodeResolver, ResolveOutcome};
use crate::model::{LocationSample, Place};
use crate::sampling::{
    AcceptanceGate, ActivityQuery, GateDecision, SamplingMode, SamplingModeController,
};
use crate::sensor::{
    ActivityClassifier, ActivityReport, AuthorizationState, PositionEvent, PositionSource,
};
use crate::store::{Record, Store};

use super::status::{EngineUpdate, TrackingStatus};

/// Capacity of the update broadcast channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Samples kept for retry after failed saves before the oldest are dropped.
const MAX_BACKLOG_SAMPLES: usize = 1024;

/// Adaptive location-sampling engine.
///
/// Owns the acceptance gate, the mode controller and the stay clusterer,
/// and processes [`PositionEvent`]s one at a time in delivery order.
/// Activity queries and geocode lookups run as Tokio tasks so they never
/// hold up the next event.
///
/// Spawning methods must be called from within a Tokio runtime.
pub struct SamplingEngine {
    source: Arc<dyn PositionSource>,
    classifier: Arc<dyn ActivityClassifier>,
    store: Arc<dyn Store>,
    resolver: Arc<GeocodeResolver>,

    gate: AcceptanceGate,
    controller: SamplingModeController,
    clusterer: StayClusterer,

    status: TrackingStatus,
    /// Set by `start_tracking`, cleared by `stop_tracking`.
    tracking_wanted: bool,

    /// Activity queries in flight; aborted on stop.
    queries: JoinSet<(u64, ActivityReport)>,
    /// Geocode lookups in flight; allowed to finish after stop.
    resolutions: JoinSet<()>,

    /// Records from failed saves, carried into the next unit of work.
    backlog: Vec<Record>,
    /// Kept places not yet durably saved, submitted for resolution once they are.
    unsubmitted: Vec<Place>,

    updates: broadcast::Sender<EngineUpdate>,
}

impl std::fmt::Debug for SamplingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingEngine")
            .field("status", &self.status)
            .field("controller", &self.controller)
            .field("open_place", &self.clusterer.open_place().map(|p| p.id))
            .field("pending_queries", &self.queries.len())
            .field("pending_resolutions", &self.resolutions.len())
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

impl SamplingEngine {
    /// Create an idle engine. Place ids continue after the store's latest.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn PositionSource>,
        classifier: Arc<dyn ActivityClassifier>,
        store: Arc<dyn Store>,
        resolver: Arc<GeocodeResolver>,
    ) -> Self {
        let clusterer =
            StayClusterer::new(config.clustering).starting_after(store.latest_place_id());
        let controller = SamplingModeController::new(config.controller, Arc::clone(&source));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            source,
            classifier,
            store,
            resolver,
            gate: AcceptanceGate::new(config.gate),
            controller,
            clusterer,
            status: TrackingStatus::Idle,
            tracking_wanted: false,
            queries: JoinSet::new(),
            resolutions: JoinSet::new(),
            backlog: Vec::new(),
            unsubmitted: Vec::new(),
            updates,
        }
    }

    /// Subscribe to engine updates.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineUpdate> {
        self.updates.subscribe()
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn mode(&self) -> SamplingMode {
        self.controller.mode()
    }

    /// The stay currently accumulating samples.
    pub fn open_place(&self) -> Option<&Place> {
        self.clusterer.open_place()
    }

    /// The place resolver shared with background tasks.
    pub fn resolver(&self) -> &Arc<GeocodeResolver> {
        &self.resolver
    }

    /// Begin tracking, or ask for permission first.
    pub fn start_tracking(&mut self) {
        self.tracking_wanted = true;
        if self.status.is_tracking() {
            return;
        }

        match self.source.authorization() {
            state if state.is_authorized() => self.begin(),
            AuthorizationState::NotDetermined => {
                self.source.request_authorization();
                self.set_status(TrackingStatus::AwaitingAuthorization);
            }
            state => {
                tracing::warn!(authorization = %state, "Cannot start tracking");
                self.set_status(TrackingStatus::PermissionDenied);
            }
        }
    }

    /// Stop tracking. Safe to call repeatedly.
    ///
    /// Finalizes the open stay, stops all monitoring, and aborts activity
    /// queries. Address lookups already running still complete and persist.
    pub fn stop_tracking(&mut self) {
        self.tracking_wanted = false;
        self.halt(TrackingStatus::Idle);
    }

    /// Process one position event.
    pub fn handle_event(&mut self, event: PositionEvent) {
        match event {
            PositionEvent::Sample(sample) => self.on_sample(sample),
            PositionEvent::GeofenceExited { center, at } => self.on_geofence_exit(center, at),
            PositionEvent::AuthorizationChanged(state) => self.on_authorization(state),
            PositionEvent::Error(error) => self.on_sensor_error(error),
        }
    }

    /// Drive the engine until the event channel closes or `shutdown` fires.
    ///
    /// Cancellation stops tracking before returning. A closed channel
    /// returns with tracking state untouched.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<PositionEvent>,
        shutdown: CancellationToken,
    ) {
        tracing::debug!("Sampling engine loop started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping tracking");
                    self.stop_tracking();
                    break;
                }

                Some(joined) = self.queries.join_next(), if !self.queries.is_empty() => {
                    self.on_query_joined(joined);
                }

                Some(joined) = self.resolutions.join_next(), if !self.resolutions.is_empty() => {
                    reap_resolution(joined);
                }

                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::debug!("Position event channel closed");
                        break;
                    }
                },
            }
        }
    }

    /// Wait for every pending activity query and address lookup.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.queries.join_next().await {
            self.on_query_joined(joined);
        }
        while let Some(joined) = self.resolutions.join_next().await {
            reap_resolution(joined);
        }
    }

    fn begin(&mut self) {
        self.gate.reset();
        self.controller.activate();
        self.set_status(TrackingStatus::Tracking);
    }

    fn halt(&mut self, status: TrackingStatus) {
        if let Some(finalization) = self.clusterer.finish() {
            let records = self.finalization_records(finalization);
            self.commit(records);
        }

        self.controller.deactivate();
        // Dropping the set aborts running queries and discards finished results
        self.queries = JoinSet::new();
        self.gate.reset();
        self.set_status(status);
    }

    fn set_status(&mut self, status: TrackingStatus) {
        if self.status == status {
            return;
        }
        tracing::info!(from = %self.status, to = %status, "Tracking status changed");
        self.status = status;
        self.publish(EngineUpdate::StatusChanged(status));
    }

    fn on_sample(&mut self, sample: LocationSample) {
        if !self.status.is_tracking() {
            tracing::debug!(status = %self.status, "Ignoring sample while not tracking");
            return;
        }

        let decision = self.gate.evaluate(&sample);
        if let GateDecision::Accepted { displacement_m, .. } = decision {
            self.controller.observe_accepted(&sample, displacement_m);
            self.ingest(sample);
        }

        if decision.triggers_activity_query() {
            let query = self.controller.begin_activity_query(sample.timestamp);
            self.spawn_activity_query(query);
        }
    }

    fn ingest(&mut self, sample: LocationSample) {
        let mut records = vec![Record::Sample(sample)];

        match self.clusterer.ingest(&sample) {
            IngestOutcome::Opened(open) | IngestOutcome::Extended(open) => {
                records.push(Record::Place(open));
            }
            IngestOutcome::Moved { finalized, opened } => {
                records.extend(self.finalization_records(finalized));
                records.push(Record::Place(opened));
            }
        }

        self.commit(records);
    }

    fn finalization_records(&mut self, finalization: Finalization) -> Vec<Record> {
        match finalization {
            Finalization::Kept(place) => {
                self.publish(EngineUpdate::PlaceFinalized(place.clone()));
                self.unsubmitted.push(place.clone());
                vec![Record::Place(place)]
            }
            Finalization::Discarded(place) => {
                self.publish(EngineUpdate::PlaceDiscarded(place.id));
                vec![Record::RemovePlace(place.id)]
            }
        }
    }

    /// Save `records` with any backlog as one unit of work.
    fn commit(&mut self, records: Vec<Record>) {
        let mut unit = std::mem::take(&mut self.backlog);
        unit.extend(records);

        if save_unit(self.store.as_ref(), &unit, &self.updates) {
            for place in std::mem::take(&mut self.unsubmitted) {
                self.spawn_resolution(place);
            }
        } else {
            trim_backlog(&mut unit);
            self.backlog = unit;
        }
    }

    fn spawn_activity_query(&mut self, query: ActivityQuery) {
        let classifier = Arc::clone(&self.classifier);
        self.queries.spawn(async move {
            let report = classifier
                .classify(query.window_start, query.window_end)
                .await;
            (query.id, report)
        });
    }

    fn on_query_joined(&mut self, joined: Result<(u64, ActivityReport), JoinError>) {
        let (query_id, report) = match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                tracing::warn!(error = %e, "Activity query task failed");
                return;
            }
        };

        tracing::debug!(query_id, report = %report, "Activity result");
        if let Some(transition) = self.controller.on_activity(query_id, report) {
            self.publish(EngineUpdate::ModeChanged(transition));
        }
    }

    fn spawn_resolution(&mut self, place: Place) {
        let resolver = Arc::clone(&self.resolver);
        let store = Arc::clone(&self.store);
        let updates = self.updates.clone();

        self.resolutions.spawn(async move {
            let mut place = place;
            match resolver.resolve(&mut place).await {
                Ok(ResolveOutcome::AlreadyResolved) | Err(_) => {}
                Ok(_) => {
                    if save_unit(store.as_ref(), &[Record::Place(place.clone())], &updates) {
                        let _ = updates.send(EngineUpdate::PlaceResolved(place));
                    }
                }
            }
        });
    }

    fn on_geofence_exit(&mut self, center: Coordinate, at: DateTime<Utc>) {
        tracing::debug!(%center, %at, "Geofence exit");
        if let Some(transition) = self.controller.on_geofence_exit(&center) {
            self.publish(EngineUpdate::ModeChanged(transition));
        }
    }

    fn on_authorization(&mut self, state: AuthorizationState) {
        tracing::info!(authorization = %state, "Authorization changed");
        if state.is_authorized() {
            if self.tracking_wanted && !self.status.is_tracking() {
                self.begin();
            }
        } else if state.is_refused() && self.tracking_wanted {
            self.halt(TrackingStatus::PermissionDenied);
        }
    }

    fn on_sensor_error(&mut self, error: SensorError) {
        match error {
            SensorError::PermissionDenied => {
                tracing::warn!(error = %error, "Sensor reported permission denied");
                if self.tracking_wanted {
                    self.halt(TrackingStatus::PermissionDenied);
                }
            }
            SensorError::LowAccuracy { accuracy } => {
                tracing::debug!(accuracy, "Sensor reported low accuracy");
            }
            SensorError::AccuracyUnavailable => {
                tracing::debug!("Sensor accuracy unavailable");
            }
            SensorError::Transient(_) | SensorError::GeofenceUnavailable(_) => {
                tracing::warn!(error = %error, "Sensor error ignored");
            }
        }
    }

    fn publish(&self, update: EngineUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}

/// Save one unit of work, rolling back on failure.
fn save_unit(
    store: &dyn Store,
    records: &[Record],
    updates: &broadcast::Sender<EngineUpdate>,
) -> bool {
    match store.save(records) {
        Ok(()) => true,
        Err(e) => {
            store.rollback();
            tracing::error!(error = %e, records = records.len(), "Failed to persist records");
            let _ = updates.send(EngineUpdate::PersistenceFailed(e));
            false
        }
    }
}

/// Drop superseded place snapshots and the oldest samples beyond the cap.
fn trim_backlog(unit: &mut Vec<Record>) {
    let mut seen = HashSet::new();
    let mut kept: Vec<Record> = Vec::with_capacity(unit.len());
    for record in unit.drain(..).rev() {
        if let Record::Place(place) = &record {
            if !seen.insert(place.id) {
                continue;
            }
        }
        kept.push(record);
    }
    kept.reverse();

    let samples = kept
        .iter()
        .filter(|r| matches!(r, Record::Sample(_)))
        .count();
    let mut excess = samples.saturating_sub(MAX_BACKLOG_SAMPLES);
    if excess > 0 {
        tracing::warn!(dropped = excess, "Backlog full, dropping oldest unsaved samples");
        kept.retain(|record| {
            if excess > 0 && matches!(record, Record::Sample(_)) {
                excess -= 1;
                return false;
            }
            true
        });
    }

    *unit = kept;
}

fn reap_resolution(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            tracing::warn!(error = %e, "Geocode task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::GeocodeConfig;
    use crate::model::PlaceId;
    use crate::sensor::ActivityKind;
    use crate::store::MemoryStore;
    use crate::test_support::{
        home_address, CountingProvider, RecordingSource, ScriptedClassifier, SourceCommand,
    };
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn origin() -> Coordinate {
        Coordinate::new(33.7962, -118.1113)
    }

    fn sample(secs: i64) -> LocationSample {
        LocationSample::new(at(secs), origin(), 10.0, 0.0)
    }

    struct Harness {
        engine: SamplingEngine,
        source: Arc<RecordingSource>,
        store: Arc<MemoryStore>,
    }

    fn harness(authorization: AuthorizationState) -> Harness {
        let source = Arc::new(RecordingSource::new(authorization));
        let classifier = Arc::new(ScriptedClassifier::always(ActivityReport::Classified(
            ActivityKind::Walking,
        )));
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = Arc::new(GeocodeResolver::new(GeocodeConfig::default(), provider));
        let engine = SamplingEngine::new(
            EngineConfig::default(),
            source.clone(),
            classifier,
            store.clone(),
            resolver,
        );
        Harness {
            engine,
            source,
            store,
        }
    }

    #[tokio::test]
    async fn test_start_requires_authorization() {
        let mut h = harness(AuthorizationState::NotDetermined);
        h.engine.start_tracking();
        assert_eq!(h.engine.status(), TrackingStatus::AwaitingAuthorization);
        assert_eq!(h.source.commands(), vec![SourceCommand::RequestAuthorization]);

        h.engine
            .handle_event(PositionEvent::AuthorizationChanged(AuthorizationState::WhenInUse));
        assert_eq!(h.engine.status(), TrackingStatus::Tracking);
        assert!(h.source.commands().contains(&SourceCommand::StartContinuous));
    }

    #[tokio::test]
    async fn test_samples_ignored_while_idle() {
        let mut h = harness(AuthorizationState::Always);
        h.engine.handle_event(PositionEvent::Sample(sample(0)));
        h.engine.settle().await;
        assert!(h.store.samples().is_empty());
        assert!(h.engine.open_place().is_none());
    }

    #[tokio::test]
    async fn test_place_ids_continue_after_store() {
        let h = harness(AuthorizationState::Always);
        let mut seeded = Place::open(PlaceId(9), &sample(-10_000));
        seeded.status = crate::model::PlaceStatus::Closed;
        h.store.save(&[Record::Place(seeded)]).unwrap();

        let mut engine = SamplingEngine::new(
            EngineConfig::default(),
            h.source.clone(),
            Arc::new(ScriptedClassifier::always(ActivityReport::Unavailable)),
            h.store.clone(),
            h.engine.resolver().clone(),
        );
        engine.start_tracking();
        engine.handle_event(PositionEvent::Sample(sample(0)));
        assert_eq!(engine.open_place().map(|p| p.id), Some(PlaceId(10)));
    }

    #[test]
    fn test_trim_backlog_keeps_latest_snapshot() {
        let mut older = Place::open(PlaceId(1), &sample(0));
        older.sample_count = 1;
        let mut newer = older.clone();
        newer.sample_count = 2;

        let mut unit = vec![
            Record::Sample(sample(0)),
            Record::Place(older),
            Record::Sample(sample(300)),
            Record::Place(newer.clone()),
        ];
        trim_backlog(&mut unit);

        assert_eq!(
            unit,
            vec![
                Record::Sample(sample(0)),
                Record::Sample(sample(300)),
                Record::Place(newer),
            ]
        );
    }

    #[test]
    fn test_trim_backlog_caps_samples() {
        let mut unit: Vec<Record> = (0..MAX_BACKLOG_SAMPLES as i64 + 5)
            .map(|i| Record::Sample(sample(i)))
            .collect();
        trim_backlog(&mut unit);

        assert_eq!(unit.len(), MAX_BACKLOG_SAMPLES);
        assert_eq!(unit[0], Record::Sample(sample(5)));
    }
}
