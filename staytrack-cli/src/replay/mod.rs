//! Offline replay of recorded position logs.
//!
//! A replay feeds every record through a [`SamplingEngine`] backed by an
//! in-memory store, waiting for background work after each event so the
//! result does not depend on task scheduling.

mod classifier;
mod geocoder;
mod log;
mod source;

pub use classifier::ReplayClassifier;
pub use geocoder::FixtureGeocoder;
pub use log::{read_log, LogRecord};
pub use source::ReplaySource;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use staytrack::config::EngineConfig;
use staytrack::engine::{EngineUpdate, ResolutionSweeper, SamplingEngine, SweeperConfig};
use staytrack::geocode::GeocodeResolver;
use staytrack::sampling::SamplingMode;
use staytrack::sensor::{AuthorizationState, PositionEvent};
use staytrack::store::MemoryStore;
use staytrack::{Place, PlaceStatus, TimeRange, TrackingStatus};

/// A mode switch observed during the replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeChange {
    pub from: SamplingMode,
    pub to: SamplingMode,
    pub reason: String,
}

/// Address lookup counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeocodeSummary {
    pub provider_calls: u64,
    pub cache_hits: u64,
    pub failures: u64,
    pub retried: usize,
    pub retry_resolved: usize,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    /// Records read from the log.
    pub records: usize,
    /// Samples that passed the acceptance gate and were saved.
    pub samples_stored: usize,
    pub mode_changes: Vec<ModeChange>,
    /// Stays closed but too short to keep.
    pub discarded: usize,
    pub persistence_failures: usize,
    /// Kept stays, oldest first.
    pub places: Vec<Place>,
    pub geocode: GeocodeSummary,
    /// Last status before the final stop.
    #[serde(skip)]
    pub final_status: TrackingStatus,
}

impl ReplayReport {
    fn observe(&mut self, update: EngineUpdate) {
        match update {
            EngineUpdate::ModeChanged(transition) => self.mode_changes.push(ModeChange {
                from: transition.from,
                to: transition.to,
                reason: transition.reason.to_string(),
            }),
            EngineUpdate::PlaceDiscarded(_) => self.discarded += 1,
            EngineUpdate::PersistenceFailed(_) => self.persistence_failures += 1,
            EngineUpdate::StatusChanged(_)
            | EngineUpdate::PlaceFinalized(_)
            | EngineUpdate::PlaceResolved(_) => {}
        }
    }
}

/// Replay settings.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub engine: EngineConfig,
    /// Authorization held by the sensor when tracking starts.
    pub authorization: AuthorizationState,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            authorization: AuthorizationState::Always,
        }
    }
}

/// Run `records` through a fresh engine and collect what it produced.
///
/// Must be called from within a Tokio runtime.
pub async fn replay(
    records: Vec<LogRecord>,
    options: ReplayOptions,
    geocoder: FixtureGeocoder,
) -> ReplayReport {
    let annotations = records
        .iter()
        .filter_map(|record| match record {
            LogRecord::Activity { timestamp, kind } => Some((*timestamp, *kind)),
            _ => None,
        })
        .collect();

    let source = Arc::new(ReplaySource::new(options.authorization));
    let classifier = Arc::new(ReplayClassifier::new(annotations));
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(GeocodeResolver::new(
        options.engine.geocode.clone(),
        Arc::new(geocoder),
    ));
    let sweeper_config = options.engine.sweeper.clone();

    let mut engine = SamplingEngine::new(
        options.engine,
        source.clone(),
        classifier,
        store.clone(),
        resolver.clone(),
    );
    let mut updates = engine.subscribe();
    let mut report = ReplayReport {
        records: records.len(),
        ..Default::default()
    };

    engine.start_tracking();
    tracing::info!(records = records.len(), status = %engine.status(), "Replay started");

    for record in records {
        let events = match record {
            LogRecord::Sample(sample) => source.events_for(sample),
            LogRecord::Authorization { state } => vec![source.set_authorization(state)],
            LogRecord::Activity { .. } => continue,
        };
        for event in events {
            deliver(&mut engine, event).await;
            collect(&mut updates, &mut report);
        }
    }

    report.final_status = engine.status();
    engine.stop_tracking();
    engine.settle().await;
    collect(&mut updates, &mut report);
    tracing::debug!(
        continuous = source.is_continuous(),
        significant_change = source.is_significant_change(),
        geofence_armed = source.armed().is_some(),
        "Sensor state after stop"
    );

    // Replays run as fast as the log allows
    let sweeper = ResolutionSweeper::new(
        SweeperConfig {
            pacing: Duration::ZERO,
            ..sweeper_config
        },
        resolver.clone(),
        store.clone(),
    );
    let sweep = sweeper
        .sweep(&TimeRange::all(), &CancellationToken::new())
        .await;

    let stats = resolver.stats();
    report.geocode = GeocodeSummary {
        provider_calls: stats.provider_calls,
        cache_hits: stats.cache_hits,
        failures: stats.failures,
        retried: sweep.candidates,
        retry_resolved: sweep.resolved,
    };

    report.samples_stored = store.samples().len();
    let mut places: Vec<Place> = store
        .places()
        .into_iter()
        .filter(|place| place.status == PlaceStatus::Closed)
        .collect();
    places.sort_by_key(|place| place.start_time);
    report.places = places;

    tracing::info!(
        places = report.places.len(),
        discarded = report.discarded,
        mode_changes = report.mode_changes.len(),
        "Replay finished"
    );
    report
}

async fn deliver(engine: &mut SamplingEngine, event: PositionEvent) {
    engine.handle_event(event);
    engine.settle().await;
}

fn collect(updates: &mut broadcast::Receiver<EngineUpdate>, report: &mut ReplayReport) {
    loop {
        match updates.try_recv() {
            Ok(update) => report.observe(update),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Replay fell behind engine updates");
            }
            Err(_) => break,
        }
    }
}
