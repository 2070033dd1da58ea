//! Reverse geocoding backend contract.

use crate::error::ResolutionError;
use crate::geo::Coordinate;
use crate::model::Address;
use crate::BoxFuture;

/// Turns a coordinate into postal address components.
///
/// Implementations make a single attempt per call. Retries, caching and
/// deduplication are handled by [`GeocodeResolver`](super::GeocodeResolver).
pub trait GeocodeProvider: Send + Sync {
    /// Look up the address at `coordinate`.
    fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Address, ResolutionError>>;
}
