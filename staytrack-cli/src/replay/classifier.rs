//! Activity classifier answering from recorded annotations.

use chrono::{DateTime, Utc};

use staytrack::sensor::{ActivityClassifier, ActivityKind, ActivityReport};
use staytrack::BoxFuture;

/// Classifier that replays `activity` records from the log.
///
/// A query reports the most recent annotation at or before the end of the
/// window. Queries before the first annotation are `Unavailable`.
#[derive(Debug, Default)]
pub struct ReplayClassifier {
    /// Sorted by timestamp.
    annotations: Vec<(DateTime<Utc>, ActivityKind)>,
}

impl ReplayClassifier {
    pub fn new(mut annotations: Vec<(DateTime<Utc>, ActivityKind)>) -> Self {
        annotations.sort_by_key(|(timestamp, _)| *timestamp);
        Self { annotations }
    }

    /// Report for a window ending at `window_end`.
    pub fn report_at(&self, window_end: DateTime<Utc>) -> ActivityReport {
        let index = self
            .annotations
            .partition_point(|(timestamp, _)| *timestamp <= window_end);
        match index.checked_sub(1) {
            Some(i) => ActivityReport::Classified(self.annotations[i].1),
            None => ActivityReport::Unavailable,
        }
    }
}

impl ActivityClassifier for ReplayClassifier {
    fn classify(
        &self,
        _window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> BoxFuture<'_, ActivityReport> {
        let report = self.report_at(window_end);
        Box::pin(async move { report })
    }
}
