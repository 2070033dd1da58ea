//! Core record types: samples, places, addresses.
//!
//! These are plain value types. Persistence is an explicit step through
//! [`crate::store::Store`]; nothing here saves itself.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A single position fix from the sensor.
///
/// Immutable once accepted by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius of uncertainty in meters. Negative means invalid.
    pub horizontal_accuracy: f64,
    /// Ground speed in m/s. Negative means unknown.
    pub speed: f64,
}

impl LocationSample {
    /// Create a new sample.
    pub fn new(
        timestamp: DateTime<Utc>,
        coordinate: Coordinate,
        horizontal_accuracy: f64,
        speed: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            horizontal_accuracy,
            speed,
        }
    }

    /// Position of this sample.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Speed with unknown (negative) values clamped to zero.
    pub fn known_speed(&self) -> f64 {
        self.speed.max(0.0)
    }
}

/// Identifier of a place, unique within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaceId(pub u64);

impl PlaceId {
    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "place-{}", self.0)
    }
}

/// Lifecycle of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceStatus {
    /// Still accumulating samples.
    #[default]
    Open,
    /// Finalized; only address fields may change.
    Closed,
}

/// Postal address components returned by a geocode provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl Address {
    /// Non-empty components in display order:
    /// name, street, city, state, country, postal code.
    fn components(&self) -> impl Iterator<Item = &str> {
        [
            &self.name,
            &self.street,
            &self.city,
            &self.state,
            &self.country,
            &self.postal_code,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
    }

    /// Single-line address joining every non-empty component with `", "`.
    pub fn formatted(&self) -> String {
        self.components().collect::<Vec<_>>().join(", ")
    }

    /// True if no component carries any text.
    pub fn is_empty(&self) -> bool {
        self.components().next().is_none()
    }
}

/// A stay: an interval during which samples clustered within a small radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub status: PlaceStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub centroid_latitude: f64,
    pub centroid_longitude: f64,
    /// Number of samples folded into the centroid (always >= 1).
    pub sample_count: u32,
    #[serde(flatten)]
    pub address: Address,
    pub formatted_address: Option<String>,
}

impl Place {
    /// Open a new place seeded with a single sample.
    pub fn open(id: PlaceId, sample: &LocationSample) -> Self {
        Self {
            id,
            status: PlaceStatus::Open,
            start_time: sample.timestamp,
            end_time: sample.timestamp,
            centroid_latitude: sample.latitude,
            centroid_longitude: sample.longitude,
            sample_count: 1,
            address: Address::default(),
            formatted_address: None,
        }
    }

    /// Running-mean centroid.
    pub fn centroid(&self) -> Coordinate {
        Coordinate::new(self.centroid_latitude, self.centroid_longitude)
    }

    /// Time between the first and last sample.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Fold a sample into the centroid with an incremental mean.
    pub(crate) fn fold(&mut self, sample: &LocationSample) {
        let n = f64::from(self.sample_count);
        self.centroid_latitude = (self.centroid_latitude * n + sample.latitude) / (n + 1.0);
        self.centroid_longitude = (self.centroid_longitude * n + sample.longitude) / (n + 1.0);
        self.sample_count += 1;
        if sample.timestamp > self.end_time {
            self.end_time = sample.timestamp;
        }
    }

    /// Whether an address has been resolved for this place.
    pub fn is_resolved(&self) -> bool {
        self.formatted_address.is_some()
    }

    /// Copy resolved address fields onto this place.
    pub fn apply_address(&mut self, address: &Address) {
        self.address = address.clone();
        self.formatted_address = Some(address.formatted());
    }

    /// Human-readable label for the place.
    ///
    /// Falls back from the formatted address to the street-level components,
    /// and finally to the centroid coordinate.
    pub fn display_address(&self) -> String {
        if let Some(formatted) = self.formatted_address.as_deref() {
            if !formatted.is_empty() {
                return formatted.to_string();
            }
        }

        let parts: Vec<&str> = [
            &self.address.street,
            &self.address.city,
            &self.address.state,
            &self.address.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            self.centroid().to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Whether any part of this place's interval falls inside `range`.
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        self.start_time < range.end && self.end_time > range.start
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range from explicit bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The UTC calendar day `date`.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + chrono::Duration::days(1),
        }
    }

    /// Unbounded range covering all representable times.
    pub fn all() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Whether `timestamp` falls inside the range.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, lat: f64, lon: f64) -> LocationSample {
        LocationSample::new(at(secs), Coordinate::new(lat, lon), 5.0, 0.0)
    }

    #[test]
    fn test_open_place_seeded_from_sample() {
        let s = sample(0, 33.7962, -118.1113);
        let place = Place::open(PlaceId(7), &s);

        assert_eq!(place.id, PlaceId(7));
        assert_eq!(place.status, PlaceStatus::Open);
        assert_eq!(place.sample_count, 1);
        assert_eq!(place.start_time, place.end_time);
        assert_eq!(place.duration(), Duration::ZERO);
        assert_eq!(place.centroid(), s.coordinate());
    }

    #[test]
    fn test_fold_updates_mean_and_end_time() {
        let mut place = Place::open(PlaceId(1), &sample(0, 10.0, 20.0));
        place.fold(&sample(60, 10.002, 20.004));

        assert_eq!(place.sample_count, 2);
        assert!((place.centroid_latitude - 10.001).abs() < 1e-9);
        assert!((place.centroid_longitude - 20.002).abs() < 1e-9);
        assert_eq!(place.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_address_formatted_skips_empty_parts() {
        let address = Address {
            name: Some("Coffee Bar".to_string()),
            street: Some("".to_string()),
            city: Some("Long Beach".to_string()),
            state: Some("CA".to_string()),
            country: Some("United States".to_string()),
            postal_code: Some("90815".to_string()),
        };
        assert_eq!(
            address.formatted(),
            "Coffee Bar, Long Beach, CA, United States, 90815"
        );
        assert!(!address.is_empty());
        assert!(Address::default().is_empty());
    }

    #[test]
    fn test_display_address_fallbacks() {
        let mut place = Place::open(PlaceId(1), &sample(0, 33.7962, -118.1113));
        assert_eq!(place.display_address(), "33.79620, -118.11130");

        place.address.city = Some("Long Beach".to_string());
        place.address.state = Some("CA".to_string());
        assert_eq!(place.display_address(), "Long Beach, CA");

        place.formatted_address = Some("Home, Long Beach".to_string());
        assert_eq!(place.display_address(), "Home, Long Beach");
    }

    #[test]
    fn test_apply_address_sets_formatted() {
        let mut place = Place::open(PlaceId(1), &sample(0, 1.0, 1.0));
        assert!(!place.is_resolved());

        place.apply_address(&Address {
            city: Some("Paris".to_string()),
            country: Some("France".to_string()),
            ..Default::default()
        });

        assert!(place.is_resolved());
        assert_eq!(place.formatted_address.as_deref(), Some("Paris, France"));
    }

    #[test]
    fn test_day_range_and_overlap() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        let day = TimeRange::day(date);
        assert_eq!(day.end - day.start, chrono::Duration::days(1));

        let inside = day.start + chrono::Duration::hours(5);
        assert!(day.contains(inside));
        assert!(!day.contains(day.end));

        let mut place = Place::open(PlaceId(1), &sample(0, 1.0, 1.0));
        place.start_time = day.start - chrono::Duration::hours(1);
        place.end_time = day.start + chrono::Duration::minutes(10);
        assert!(place.overlaps(&day));

        place.end_time = day.start;
        assert!(!place.overlaps(&day));
    }

    #[test]
    fn test_place_serializes_flat_address() {
        let mut place = Place::open(PlaceId(3), &sample(0, 1.0, 2.0));
        place.address.city = Some("Oslo".to_string());
        let json = serde_json::to_value(&place).unwrap();
        assert_eq!(json["city"], "Oslo");
        assert_eq!(json["status"], "open");
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn test_known_speed_clamps_negative() {
        let mut s = sample(0, 0.0, 0.0);
        s.speed = -1.0;
        assert_eq!(s.known_speed(), 0.0);
    }
}
