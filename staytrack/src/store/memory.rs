//! In-memory store with failure injection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::PersistenceError;
use crate::model::{LocationSample, Place, PlaceId, TimeRange};

use super::{Record, Store};

#[derive(Debug, Default)]
struct MemoryInner {
    samples: Vec<LocationSample>,
    places: BTreeMap<PlaceId, Place>,
    latest_place_id: Option<PlaceId>,
    commits: u64,
    rollbacks: u64,
}

impl MemoryInner {
    fn apply(&mut self, record: Record) {
        match record {
            Record::Sample(sample) => self.samples.push(sample),
            Record::Place(place) => {
                self.latest_place_id = self.latest_place_id.max(Some(place.id));
                self.places.insert(place.id, place);
            }
            Record::RemovePlace(id) => {
                self.places.remove(&id);
            }
        }
    }
}

/// [`Store`] kept entirely in memory.
///
/// A failed save applies none of its records and keeps none of them
/// around, so a concurrent successful save from another caller never
/// commits them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    failures_remaining: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail.
    pub fn fail_next_saves(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Every committed place, ordered by id.
    pub fn places(&self) -> Vec<Place> {
        self.inner.lock().places.values().cloned().collect()
    }

    /// A committed place by id.
    pub fn place(&self, id: PlaceId) -> Option<Place> {
        self.inner.lock().places.get(&id).cloned()
    }

    /// Every committed sample in insertion order.
    pub fn samples(&self) -> Vec<LocationSample> {
        self.inner.lock().samples.clone()
    }

    /// Number of rollbacks requested by callers.
    pub fn rollbacks(&self) -> u64 {
        self.inner.lock().rollbacks
    }

    /// Number of successful saves.
    pub fn commits(&self) -> u64 {
        self.inner.lock().commits
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Store for MemoryStore {
    fn save(&self, records: &[Record]) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        if self.take_failure() {
            return Err(PersistenceError::SaveFailed(format!(
                "injected failure with {} records",
                records.len()
            )));
        }

        for record in records {
            inner.apply(record.clone());
        }
        inner.commits += 1;
        Ok(())
    }

    fn rollback(&self) {
        self.inner.lock().rollbacks += 1;
        tracing::debug!("Store rolled back");
    }

    fn recent_places(&self, range: &TimeRange, limit: usize) -> Vec<Place> {
        let inner = self.inner.lock();
        let mut places: Vec<Place> = inner
            .places
            .values()
            .filter(|place| place.overlaps(range))
            .cloned()
            .collect();
        places.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        places.truncate(limit);
        places
    }

    fn recent_samples(&self, range: &TimeRange, limit: usize) -> Vec<LocationSample> {
        let inner = self.inner.lock();
        let mut samples: Vec<LocationSample> = inner
            .samples
            .iter()
            .filter(|sample| range.contains(sample.timestamp))
            .copied()
            .collect();
        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        samples.truncate(limit);
        samples
    }

    fn latest_place_id(&self) -> Option<PlaceId> {
        self.inner.lock().latest_place_id
    }
}
