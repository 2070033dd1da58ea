//! Durable storage of samples and places.
//!
//! Writes are grouped into units of work: one [`Store::save`] call either
//! applies every [`Record`] or none of them. After a failed save the caller
//! must [`rollback`](Store::rollback) before continuing.

mod memory;

pub use memory::MemoryStore;

use crate::error::PersistenceError;
use crate::model::{LocationSample, Place, PlaceId, TimeRange};

/// One write in a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Append an accepted sample.
    Sample(LocationSample),
    /// Insert or replace a place by id.
    Place(Place),
    /// Delete a place, e.g. a discarded short stay.
    RemovePlace(PlaceId),
}

/// Persistence backend for the engine.
pub trait Store: Send + Sync {
    /// Apply `records` as one unit of work.
    fn save(&self, records: &[Record]) -> Result<(), PersistenceError>;

    /// Discard any partial state left by a failed save.
    fn rollback(&self);

    /// Places overlapping `range`, newest start first, at most `limit`.
    fn recent_places(&self, range: &TimeRange, limit: usize) -> Vec<Place>;

    /// Samples inside `range`, newest first, at most `limit`.
    fn recent_samples(&self, range: &TimeRange, limit: usize) -> Vec<LocationSample>;

    /// Highest place id ever saved.
    fn latest_place_id(&self) -> Option<PlaceId>;
}
