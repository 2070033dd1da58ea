//! Sampling engine orchestration.
//!
//! ```text
//! PositionEvent ─► AcceptanceGate ─(accepted)─► StayClusterer ─► Store
//!                       │                             │
//!                       │                             └─(kept place)─► GeocodeResolver task
//!                       ▼
//!              activity query task ─► SamplingModeController ─► PositionSource
//! ```

mod sampling_engine;
mod status;
mod sweeper;

pub use sampling_engine::{SamplingEngine, UPDATE_CHANNEL_CAPACITY};
pub use status::{EngineUpdate, TrackingStatus};
pub use sweeper::{ResolutionSweeper, SweepReport, SweeperConfig};
