//! Stay extraction.
//!
//! Turns the accepted-sample stream into [`Place`](crate::model::Place)
//! records with an incremental centroid.
//!
//! ```text
//! sample ─► open place? ──no──► open new place (count = 1)
//!               │yes
//!               ▼
//!        distance to centroid < 30m ──yes──► fold into running mean
//!               │no
//!               ▼
//!        finalize open place (discard if < 180s) ─► open new place
//! ```

mod clusterer;

pub use clusterer::{ClusteringConfig, Finalization, IngestOutcome, StayClusterer};
