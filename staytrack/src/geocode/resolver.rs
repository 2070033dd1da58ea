//! Place address resolution with a proximity cache and in-flight dedupe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;

use crate::error::ResolutionError;
use crate::geo::Coordinate;
use crate::model::{Address, Place};
use crate::BoxFuture;

use super::cache::GeocodeCache;
use super::provider::GeocodeProvider;

type SharedLookup = Shared<BoxFuture<'static, Result<Address, ResolutionError>>>;

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeConfig {
    /// Cached or in-flight lookups closer than this are reused (meters).
    pub cache_radius_m: f64,
    /// Maximum number of cached addresses.
    pub cache_capacity: usize,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            cache_radius_m: 30.0,
            cache_capacity: 512,
        }
    }
}

/// How a successful [`GeocodeResolver::resolve`] was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The place already had a formatted address; nothing changed.
    AlreadyResolved,
    /// Copied from a cached nearby address.
    CacheHit,
    /// Fetched from the provider.
    Resolved,
    /// Shared the result of a concurrent lookup for a nearby coordinate.
    Joined,
}

/// Snapshot of resolver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub joined: u64,
    pub provider_calls: u64,
    pub failures: u64,
    pub cached_entries: usize,
}

impl ResolverStats {
    /// Fraction of lookups answered without a new provider call.
    pub fn hit_rate(&self) -> f64 {
        let reused = self.cache_hits + self.joined;
        let total = reused + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            reused as f64 / total as f64
        }
    }
}

struct InFlight {
    id: u64,
    coordinate: Coordinate,
    lookup: SharedLookup,
}

struct ResolverState {
    cache: GeocodeCache,
    in_flight: Vec<InFlight>,
    next_flight_id: u64,
}

/// Fills in place addresses through a [`GeocodeProvider`].
///
/// Constructed once and shared; there is no global instance.
pub struct GeocodeResolver {
    config: GeocodeConfig,
    provider: Arc<dyn GeocodeProvider>,
    state: Mutex<ResolverState>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    joined: AtomicU64,
    provider_calls: AtomicU64,
    failures: AtomicU64,
}

impl std::fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeResolver")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl GeocodeResolver {
    pub fn new(config: GeocodeConfig, provider: Arc<dyn GeocodeProvider>) -> Self {
        let cache = GeocodeCache::new(config.cache_radius_m, config.cache_capacity);
        Self {
            config,
            provider,
            state: Mutex::new(ResolverState {
                cache,
                in_flight: Vec::new(),
                next_flight_id: 0,
            }),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Resolve the address of `place` and copy it onto the place.
    ///
    /// On error the place is left untouched. There is no retry.
    pub async fn resolve(&self, place: &mut Place) -> Result<ResolveOutcome, ResolutionError> {
        if place.is_resolved() {
            return Ok(ResolveOutcome::AlreadyResolved);
        }

        let coordinate = place.centroid();
        let (flight_id, lookup, outcome) = {
            let mut state = self.state.lock();

            if let Some(address) = state.cache.lookup(&coordinate) {
                place.apply_address(address);
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(place = %place.id, %coordinate, "Geocode cache hit");
                return Ok(ResolveOutcome::CacheHit);
            }

            let radius = self.config.cache_radius_m;
            let pending = state
                .in_flight
                .iter()
                .find(|flight| flight.coordinate.is_within(&coordinate, radius))
                .map(|flight| (flight.id, flight.lookup.clone()));

            if let Some((id, lookup)) = pending {
                self.joined.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(place = %place.id, %coordinate, "Joining in-flight geocode");
                (id, lookup, ResolveOutcome::Joined)
            } else {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
                self.provider_calls.fetch_add(1, Ordering::Relaxed);

                let id = state.next_flight_id;
                state.next_flight_id += 1;
                let lookup = self.start_lookup(coordinate);
                state.in_flight.push(InFlight {
                    id,
                    coordinate,
                    lookup: lookup.clone(),
                });
                (id, lookup, ResolveOutcome::Resolved)
            }
        };

        let result = lookup.await;
        self.complete_flight(flight_id, &result);

        match result {
            Ok(address) => {
                place.apply_address(&address);
                tracing::debug!(
                    place = %place.id,
                    address = %place.display_address(),
                    "Place resolved"
                );
                Ok(outcome)
            }
            Err(e) => {
                if outcome == ResolveOutcome::Resolved {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                }
                tracing::warn!(place = %place.id, %coordinate, error = %e, "Geocode failed");
                Err(e)
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> ResolverStats {
        let cached_entries = self.state.lock().cache.len();
        ResolverStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cached_entries,
        }
    }

    /// Drop every cached address.
    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }

    fn start_lookup(&self, coordinate: Coordinate) -> SharedLookup {
        let provider = Arc::clone(&self.provider);
        let lookup: BoxFuture<'static, Result<Address, ResolutionError>> =
            Box::pin(async move { provider.reverse_geocode(coordinate).await });
        lookup.shared()
    }

    /// Retire an in-flight lookup and cache its address.
    ///
    /// Whichever participant finishes first does the work; later calls
    /// find the entry gone.
    fn complete_flight(&self, id: u64, result: &Result<Address, ResolutionError>) {
        let mut state = self.state.lock();
        let Some(pos) = state.in_flight.iter().position(|flight| flight.id == id) else {
            return;
        };
        let flight = state.in_flight.swap_remove(pos);
        if let Ok(address) = result {
            state.cache.insert(flight.coordinate, address.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationSample, PlaceId};
    use crate::test_support::{home_address, CountingProvider};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn origin() -> Coordinate {
        Coordinate::new(33.7962, -118.1113)
    }

    fn place_at(id: u64, coordinate: Coordinate) -> Place {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Place::open(PlaceId(id), &LocationSample::new(ts, coordinate, 5.0, 0.0))
    }

    fn resolver(provider: Arc<CountingProvider>) -> GeocodeResolver {
        GeocodeResolver::new(GeocodeConfig::default(), provider)
    }

    #[tokio::test]
    async fn test_resolve_copies_address_fields() {
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = resolver(provider.clone());
        let mut place = place_at(1, origin());

        let outcome = resolver.resolve(&mut place).await.unwrap();
        assert_eq!(outcome, ResolveOutcome::Resolved);
        assert_eq!(place.address, home_address());
        assert_eq!(
            place.formatted_address.as_deref(),
            Some("Home, Ocean Blvd, Long Beach, CA, United States, 90802")
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_nearby_places_share_one_lookup() {
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = resolver(provider.clone());

        let mut first = place_at(1, origin());
        let mut second = place_at(2, origin().offset_meters(10.0, 0.0));
        resolver.resolve(&mut first).await.unwrap();
        let outcome = resolver.resolve(&mut second).await.unwrap();

        assert_eq!(outcome, ResolveOutcome::CacheHit);
        assert_eq!(first.formatted_address, second.formatted_address);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_distant_places_call_provider_twice() {
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = resolver(provider.clone());

        let mut first = place_at(1, origin());
        let mut second = place_at(2, origin().offset_meters(50.0, 0.0));
        resolver.resolve(&mut first).await.unwrap();
        let outcome = resolver.resolve(&mut second).await.unwrap();

        assert_eq!(outcome, ResolveOutcome::Resolved);
        assert_eq!(provider.calls(), 2);
        assert_eq!(resolver.stats().cached_entries, 2);
    }

    #[tokio::test]
    async fn test_already_resolved_is_noop() {
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = resolver(provider.clone());
        let mut place = place_at(1, origin());
        place.formatted_address = Some("Somewhere".to_string());

        let outcome = resolver.resolve(&mut place).await.unwrap();
        assert_eq!(outcome, ResolveOutcome::AlreadyResolved);
        assert_eq!(place.formatted_address.as_deref(), Some("Somewhere"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_leaves_place_unresolved() {
        let provider = Arc::new(CountingProvider::failing(ResolutionError::ProviderFailure(
            "network down".to_string(),
        )));
        let resolver = resolver(provider.clone());
        let mut place = place_at(1, origin());

        let err = resolver.resolve(&mut place).await.unwrap_err();
        assert_eq!(err, ResolutionError::ProviderFailure("network down".to_string()));
        assert!(!place.is_resolved());
        assert!(place.address.is_empty());
        assert_eq!(resolver.stats().failures, 1);
        assert_eq!(resolver.stats().cached_entries, 0);

        // Failures are not cached; a later attempt calls the provider again
        provider.set_result(Ok(home_address()));
        resolver.resolve(&mut place).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_are_deduplicated() {
        let provider = Arc::new(
            CountingProvider::returning(home_address()).with_delay(Duration::from_millis(50)),
        );
        let resolver = resolver(provider.clone());

        let mut first = place_at(1, origin());
        let mut second = place_at(2, origin().offset_meters(5.0, 0.0));
        let (a, b) = tokio::join!(resolver.resolve(&mut first), resolver.resolve(&mut second));

        assert_eq!(a.unwrap(), ResolveOutcome::Resolved);
        assert_eq!(b.unwrap(), ResolveOutcome::Joined);
        assert_eq!(provider.calls(), 1);
        assert_eq!(first.formatted_address, second.formatted_address);
        assert_eq!(resolver.stats().cached_entries, 1);
    }

    #[tokio::test]
    async fn test_stats_hit_rate() {
        let provider = Arc::new(CountingProvider::returning(home_address()));
        let resolver = resolver(provider);

        resolver.resolve(&mut place_at(1, origin())).await.unwrap();
        resolver.resolve(&mut place_at(2, origin())).await.unwrap();

        let stats = resolver.stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

        resolver.clear_cache();
        assert_eq!(resolver.stats().cached_entries, 0);
    }
}
