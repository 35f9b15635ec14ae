// Scrape Run Result (ephemeral, never persisted)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-source breakdown of one scrape run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// Valid listings returned by the source
    pub found: usize,
    /// New inserts plus stale refreshes
    pub added: usize,
    /// Fetches that exhausted their retries
    pub errors: usize,
    /// Listings dropped by normalization
    pub skipped: usize,
    /// Candidates whose save failed
    pub failed_saves: usize,
}

/// A source-level failure recorded in the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Summary of one Aggregator invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub total_found: usize,
    pub total_added: usize,
    pub per_source: BTreeMap<String, SourceStats>,
    pub errors: Vec<SourceFailure>,
    pub started_at: i64,
    pub finished_at: i64,
    pub duration_ms: i64,
}

impl RunResult {
    pub fn started(now_millis: i64) -> Self {
        Self {
            started_at: now_millis,
            finished_at: now_millis,
            ..Default::default()
        }
    }

    /// Fold one source's outcome into the totals
    pub fn record_source(
        &mut self,
        source: impl Into<String>,
        stats: SourceStats,
        failures: Vec<String>,
    ) {
        let source = source.into();
        self.total_found += stats.found;
        self.total_added += stats.added;
        self.errors.extend(failures.into_iter().map(|error| SourceFailure {
            source: source.clone(),
            error,
        }));
        self.per_source.insert(source, stats);
    }

    pub fn finish(&mut self, now_millis: i64) {
        self.finished_at = now_millis;
        self.duration_ms = now_millis - self.started_at;
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
