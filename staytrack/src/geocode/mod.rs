//! Reverse geocoding of finalized places.
//!
//! ```text
//! resolve(place) ─► formatted? ──yes──► AlreadyResolved
//!                       │no
//!                       ▼  (one lock)
//!              cache hit within 30m? ──yes──► CacheHit
//!                       │no
//!              in-flight within 30m? ──yes──► join ─► Joined
//!                       │no
//!                       ▼
//!              provider.reverse_geocode ─► cache ─► Resolved
//! ```

mod cache;
mod provider;
mod resolver;

pub use cache::GeocodeCache;
pub use provider::GeocodeProvider;
pub use resolver::{GeocodeConfig, GeocodeResolver, ResolveOutcome, ResolverStats};
