//! Spatial address cache.
//!
//! Entries are keyed by coordinate and matched by proximity rather than
//! equality. The cache is bounded; once full, the oldest entry is evicted.

use std::collections::VecDeque;

use crate::geo::Coordinate;
use crate::model::Address;

#[derive(Debug, Clone)]
struct CacheEntry {
    coordinate: Coordinate,
    address: Address,
}

/// Bounded proximity cache of resolved addresses.
#[derive(Debug)]
pub struct GeocodeCache {
    radius_m: f64,
    capacity: usize,
    entries: VecDeque<CacheEntry>,
    evictions: u64,
}

impl GeocodeCache {
    /// Create a cache matching lookups closer than `radius_m`.
    ///
    /// A `capacity` of zero disables caching.
    pub fn new(radius_m: f64, capacity: usize) -> Self {
        Self {
            radius_m,
            capacity,
            entries: VecDeque::with_capacity(capacity.min(64)),
            evictions: 0,
        }
    }

    /// Address of the nearest entry within the cache radius.
    pub fn lookup(&self, coordinate: &Coordinate) -> Option<&Address> {
        self.entries
            .iter()
            .map(|entry| (entry.coordinate.distance_to(coordinate), entry))
            .filter(|(distance, _)| *distance < self.radius_m)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, entry)| &entry.address)
    }

    /// Store `address` at `coordinate`, evicting the oldest entry if full.
    pub fn insert(&mut self, coordinate: Coordinate, address: Address) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evictions += 1;
        }
        self.entries.push_back(CacheEntry {
            coordinate,
            address,
        });
    }

    /// Match radius in meters.
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped to make room since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
