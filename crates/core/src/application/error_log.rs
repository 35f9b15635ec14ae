// In-memory bounded error log (ring buffer)

use crate::error::Result;
use crate::port::{ErrorLog, ErrorLogEntry};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Process-local error log holding at most `capacity` entries
///
/// Lost on restart; use the SQLite-backed store when durability matters.
pub struct MemoryErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorLogEntry>>,
}

impl MemoryErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorLogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ErrorLog for MemoryErrorLog {
    async fn record(&self, entry: ErrorLogEntry) -> Result<()> {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ErrorLogEntry>> {
        Ok(self.lock().iter().rev().take(limit).cloned().collect())
    }

    async fn prune_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;

    #[tokio::test]
    async fn test_evicts_oldest_beyond_capacity() {
        let log = MemoryErrorLog::new(3);
        for i in 0..5 {
            log.record(ErrorLogEntry::new(i, TaskKind::Scrape, format!("error {}", i)))
                .await
                .unwrap();
        }

        assert_eq!(log.len().await.unwrap(), 3);
        let recent = log.recent(10).await.unwrap();
        let messages: Vec<_> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["error 4", "error 3", "error 2"]);
    }

    #[tokio::test]
    async fn test_prune_removes_old_entries() {
        let log = MemoryErrorLog::new(50);
        log.record(ErrorLogEntry::new(100, TaskKind::Cleanup, "old"))
            .await
            .unwrap();
        log.record(ErrorLogEntry::new(900, TaskKind::HealthCheck, "new").with_source("net"))
            .await
            .unwrap();

        assert_eq!(log.prune_older_than(500).await.unwrap(), 1);
        let remaining = log.recent(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].source.as_deref(), Some("net"));
    }
}
