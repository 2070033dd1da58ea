//! Sensor collaborators.
//!
//! The engine never talks to platform location APIs directly. It consumes
//! [`PositionEvent`]s from a channel and issues commands through the
//! [`PositionSource`] trait; motion classification is queried through
//! [`ActivityClassifier`].
//!
//! ```text
//! PositionSource ──(PositionEvent channel)──► SamplingEngine
//!        ▲                                        │
//!        └──────── start/stop/arm commands ───────┘
//!
//! ActivityClassifier ◄── classify(window) ── SamplingEngine (spawned query)
//! ```

mod activity;
mod position;

pub use activity::{ActivityClassifier, ActivityKind, ActivityReport};
pub use position::{AuthorizationState, Geofence, PositionEvent, PositionSource};
