//! Incremental stay clusterer.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{LocationSample, Place, PlaceId, PlaceStatus};

/// Configuration for stay extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    /// Samples closer than this to the open centroid are folded into it (meters).
    pub place_distance_threshold_m: f64,

    /// Places shorter than this are discarded at finalize.
    pub minimum_place_duration: Duration,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            place_distance_threshold_m: 30.0,
            minimum_place_duration: Duration::from_secs(180),
        }
    }
}

/// What happened to a place when it was closed.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalization {
    /// Long enough to keep; status is `Closed`.
    Kept(Place),
    /// Too short; must never be exposed.
    Discarded(Place),
}

impl Finalization {
    /// The place regardless of outcome.
    pub fn place(&self) -> &Place {
        match self {
            Finalization::Kept(place) | Finalization::Discarded(place) => place,
        }
    }

    /// Whether the place was kept.
    pub fn is_kept(&self) -> bool {
        matches!(self, Finalization::Kept(_))
    }
}

/// Result of ingesting one accepted sample.
///
/// Places are snapshots; the clusterer keeps ownership of the open place.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// No place was open; a new one was seeded.
    Opened(Place),
    /// The sample was folded into the open place.
    Extended(Place),
    /// The sample left the open place, which was finalized, and seeded a new one.
    Moved {
        finalized: Finalization,
        opened: Place,
    },
}

impl IngestOutcome {
    /// Snapshot of the place that is open after this ingest.
    pub fn open_place(&self) -> &Place {
        match self {
            IngestOutcome::Opened(place) | IngestOutcome::Extended(place) => place,
            IngestOutcome::Moved { opened, .. } => opened,
        }
    }

    /// The place finalized by this ingest, if any.
    pub fn finalized(&self) -> Option<&Finalization> {
        match self {
            IngestOutcome::Moved { finalized, .. } => Some(finalized),
            _ => None,
        }
    }
}

/// Groups accepted samples into stays.
///
/// Owns at most one open place. Finalized places are handed out by value
/// and never touched again.
#[derive(Debug)]
pub struct StayClusterer {
    config: ClusteringConfig,
    open: Option<Place>,
    next_id: PlaceId,
}

impl Default for StayClusterer {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

impl StayClusterer {
    /// Create a clusterer whose first place gets id 1.
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            open: None,
            next_id: PlaceId(1),
        }
    }

    /// Continue numbering after `last`, typically the store's latest id.
    pub fn starting_after(mut self, last: Option<PlaceId>) -> Self {
        if let Some(last) = last {
            self.next_id = last.next();
        }
        self
    }

    /// The place currently accumulating samples.
    pub fn open_place(&self) -> Option<&Place> {
        self.open.as_ref()
    }

    /// Fold an accepted sample into the open place or start a new one.
    pub fn ingest(&mut self, sample: &LocationSample) -> IngestOutcome {
        let Some(mut current) = self.open.take() else {
            let opened = self.open_new(sample);
            return IngestOutcome::Opened(opened);
        };

        let distance = current.centroid().distance_to(&sample.coordinate());
        if distance < self.config.place_distance_threshold_m {
            current.fold(sample);
            let snapshot = current.clone();
            self.open = Some(current);
            return IngestOutcome::Extended(snapshot);
        }

        tracing::debug!(
            place = %current.id,
            distance_m = distance,
            "Sample left open place"
        );
        let finalized = self.finalize(current, sample.timestamp);
        let opened = self.open_new(sample);
        IngestOutcome::Moved { finalized, opened }
    }

    /// Close the open place at its last sample, e.g. when tracking stops.
    pub fn finish(&mut self) -> Option<Finalization> {
        let place = self.open.take()?;
        let left_at = place.end_time;
        Some(self.finalize(place, left_at))
    }

    /// Close `place`, extending it to `left_at`, and decide whether to keep it.
    pub fn finalize(&self, mut place: Place, left_at: DateTime<Utc>) -> Finalization {
        if left_at > place.end_time {
            place.end_time = left_at;
        }

        let duration = place.duration();
        if duration < self.config.minimum_place_duration {
            tracing::debug!(
                place = %place.id,
                duration_s = duration.as_secs(),
                "Discarding short stay"
            );
            return Finalization::Discarded(place);
        }

        place.status = PlaceStatus::Closed;
        tracing::info!(
            place = %place.id,
            duration_s = duration.as_secs(),
            samples = place.sample_count,
            centroid = %place.centroid(),
            "Stay finalized"
        );
        Finalization::Kept(place)
    }

    fn open_new(&mut self, sample: &LocationSample) -> Place {
        let place = Place::open(self.next_id, sample);
        self.next_id = self.next_id.next();
        self.open = Some(place.clone());
        place
    }
}
