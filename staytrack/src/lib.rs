//! StayTrack - Adaptive location sampling and place extraction
//!
//! This library turns a stream of raw position fixes into a compact history
//! of stays (places) while keeping the sensor in the cheapest mode that
//! still notices departures:
//!
//! - [`sampling`] filters fixes and switches between continuous and
//!   low-power monitoring
//! - [`clustering`] groups accepted samples into places
//! - [`geocode`] resolves place addresses with a proximity cache
//! - [`engine`] orchestrates all of the above over an event channel
//!
//! Platform sensors, classifiers, geocoders and storage are injected
//! through the traits in [`sensor`], [`geocode`] and [`store`].

use std::future::Future;
use std::pin::Pin;

pub mod clustering;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod logging;
pub mod model;
pub mod sampling;
pub mod sensor;
pub mod store;

#[cfg(test)]
mod test_support;

/// Boxed future used by the dyn-compatible async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use engine::{EngineUpdate, SamplingEngine, TrackingStatus};
pub use error::{PersistenceError, ResolutionError, SensorError};
pub use geo::Coordinate;
pub use model::{Address, LocationSample, Place, PlaceId, PlaceStatus, TimeRange};
