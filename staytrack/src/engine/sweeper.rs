//! Background re-resolution of places left without an address.
//!
//! A geocode failure is never retried by the engine. The sweeper is the
//! scheduler that picks those places up later: it walks the closed,
//! unresolved places of a time range one at a time, pausing between
//! provider calls, and saves each resolved place back to the store.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::geocode::{GeocodeResolver, ResolveOutcome};
use crate::model::{PlaceStatus, TimeRange};
use crate::store::{Record, Store};

/// Sweeper tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SweeperConfig {
    /// Pause after each lookup that reached the provider.
    pub pacing: Duration,
    /// Maximum places examined per sweep.
    pub batch_limit: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(2),
            batch_limit: 200,
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Unresolved places found in the range.
    pub candidates: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Whether the sweep stopped early on cancellation.
    pub cancelled: bool,
}

/// Re-submits unresolved places to the [`GeocodeResolver`].
pub struct ResolutionSweeper {
    config: SweeperConfig,
    resolver: Arc<GeocodeResolver>,
    store: Arc<dyn Store>,
}

impl ResolutionSweeper {
    pub fn new(
        config: SweeperConfig,
        resolver: Arc<GeocodeResolver>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
        }
    }

    /// Resolve every closed, unresolved place overlapping `range`.
    pub async fn sweep(&self, range: &TimeRange, cancel: &CancellationToken) -> SweepReport {
        let candidates: Vec<_> = self
            .store
            .recent_places(range, self.config.batch_limit)
            .into_iter()
            .filter(|place| place.status == PlaceStatus::Closed && !place.is_resolved())
            .collect();

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        if candidates.is_empty() {
            return report;
        }

        tracing::info!(candidates = report.candidates, "Resolving unresolved places");

        let mut pause = false;
        for mut place in candidates {
            if pause {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.pacing) => {}
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.resolver.resolve(&mut place).await {
                Ok(outcome) => {
                    pause = matches!(outcome, ResolveOutcome::Resolved | ResolveOutcome::Joined);
                    if outcome == ResolveOutcome::AlreadyResolved {
                        continue;
                    }
                    if let Err(e) = self.store.save(&[Record::Place(place)]) {
                        self.store.rollback();
                        tracing::error!(error = %e, "Failed to save resolved place");
                        report.failed += 1;
                    } else {
                        report.resolved += 1;
                    }
                }
                Err(_) => {
                    pause = true;
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            resolved = report.resolved,
            failed = report.failed,
            cancelled = report.cancelled,
            "Resolution sweep finished"
        );
        report
    }
}
