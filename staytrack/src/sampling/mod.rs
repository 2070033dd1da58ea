//! Adaptive sampling: the acceptance gate and the mode controller.
//!
//! # Acceptance Gate
//!
//! ```text
//! accuracy < 0 or > 100m                 -> reject (low accuracy)
//! speed > 5 m/s   OR displacement > 100m -> min interval 30s
//! speed > 1.5 m/s OR displacement > 30m  -> min interval 90s
//! otherwise                              -> min interval 300s
//! sooner than min interval after last accepted sample -> reject (rate limited)
//! ```
//!
//! # Mode State Machine
//!
//! ```text
//!             stationary sample + no motion
//! Continuous ──────────────────────────────► SignificantChangeOnly ──(fence armed)──► Geofenced
//!     ▲                                               │                                  │
//!     └──────────── geofence exit OR motion ──────────┴──────────────────────────────────┘
//! ```

mod config;
mod controller;
mod gate;
mod mode;

pub use config::{GateConfig, ModeControllerConfig};
pub use controller::{ActivityQuery, ModeTransition, SamplingModeController, TransitionReason};
pub use gate::{AcceptanceGate, GateDecision};
pub use mode::SamplingMode;
