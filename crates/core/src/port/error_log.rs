// Error Log Port
// Bounded, time-pruned log of task failures consumed by health and statistics reporting.

use crate::domain::TaskKind;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// Epoch ms
    pub timestamp: i64,
    pub task: TaskKind,
    /// Source name for per-source scrape failures
    pub source: Option<String>,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn new(timestamp: i64, task: TaskKind, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            task,
            source: None,
            message: message.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Error log store
///
/// Implementations keep at most `capacity` entries, dropping the oldest first.
#[async_trait]
pub trait ErrorLog: Send + Sync {
    /// Append an entry, evicting the oldest beyond capacity
    async fn record(&self, entry: ErrorLogEntry) -> Result<()>;

    /// Most recent `limit` entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<ErrorLogEntry>>;

    /// Drop entries older than `cutoff` (epoch ms), returning how many were removed
    async fn prune_older_than(&self, cutoff: i64) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}
