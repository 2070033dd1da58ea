//! Offline geocoder answering from an address fixture file.
//!
//! ```json
//! [
//!   {"latitude": 45.764, "longitude": 4.8357, "address": {"name": "Atelier", "city": "Lyon"}}
//! ]
//! ```

use std::path::Path;

use serde::Deserialize;

use staytrack::error::ResolutionError;
use staytrack::geocode::GeocodeProvider;
use staytrack::{Address, BoxFuture, Coordinate};

use crate::error::CliError;

/// Fixtures further than this from the queried point do not match.
pub const FIXTURE_MATCH_RADIUS_M: f64 = 200.0;

/// One known address.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressFixture {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Address,
}

impl AddressFixture {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Geocode provider that returns the nearest fixture.
#[derive(Debug, Default)]
pub struct FixtureGeocoder {
    fixtures: Vec<AddressFixture>,
}

impl FixtureGeocoder {
    pub fn new(fixtures: Vec<AddressFixture>) -> Self {
        Self { fixtures }
    }

    /// Load fixtures from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|error| CliError::FileRead {
            path: path.to_path_buf(),
            error,
        })?;
        let fixtures: Vec<AddressFixture> =
            serde_json::from_str(&content).map_err(|error| CliError::InvalidFixtures {
                path: path.to_path_buf(),
                error,
            })?;
        tracing::info!(path = %path.display(), count = fixtures.len(), "Loaded address fixtures");
        Ok(Self::new(fixtures))
    }

    fn nearest(&self, coordinate: &Coordinate) -> Option<&AddressFixture> {
        self.fixtures
            .iter()
            .map(|fixture| (fixture.coordinate().distance_to(coordinate), fixture))
            .filter(|(distance, _)| *distance <= FIXTURE_MATCH_RADIUS_M)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, fixture)| fixture)
    }
}

impl GeocodeProvider for FixtureGeocoder {
    fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Address, ResolutionError>> {
        let result = self
            .nearest(&coordinate)
            .map(|fixture| fixture.address.clone())
            .ok_or(ResolutionError::NoResult);
        Box::pin(async move { result })
    }
}
