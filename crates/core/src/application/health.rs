// Health Monitor
// Network + store reachability and daily statistics; failures feed the error log.

use crate::domain::{PostingStatus, TaskKind};
use crate::port::{
    ErrorLog, ErrorLogEntry, NetworkProbe, PostingFilter, PostingRepository, TimeProvider,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub timestamp: i64,
    pub network_ok: bool,
    pub store_ok: bool,
    /// `None` when the store was unreachable
    pub stats: Option<HealthStats>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStats {
    pub active_postings: i64,
    pub added_today: i64,
}

pub struct HealthMonitor {
    repo: Arc<dyn PostingRepository>,
    probe: Arc<dyn NetworkProbe>,
    error_log: Arc<dyn ErrorLog>,
    time_provider: Arc<dyn TimeProvider>,
}

impl HealthMonitor {
    pub fn new(
        repo: Arc<dyn PostingRepository>,
        probe: Arc<dyn NetworkProbe>,
        error_log: Arc<dyn ErrorLog>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            probe,
            error_log,
            time_provider,
        }
    }

    /// Run all three checks; `healthy = network_ok && store_ok`
    pub async fn check(&self) -> HealthReport {
        let now = self.time_provider.now_millis();
        let mut errors = Vec::new();

        let network_ok = match self.probe.check().await {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!("network: {}", e));
                false
            }
        };

        let store_ok = match self.repo.count(&PostingFilter::new()).await {
            Ok(_) => true,
            Err(e) => {
                errors.push(format!("store: {}", e));
                false
            }
        };

        let stats = if store_ok {
            match self.stats().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    errors.push(format!("stats: {}", e));
                    None
                }
            }
        } else {
            None
        };

        for message in &errors {
            let entry = ErrorLogEntry::new(now, TaskKind::HealthCheck, message.clone());
            if let Err(e) = self.error_log.record(entry).await {
                warn!(error = %e, "Failed to record health failure");
            }
        }

        let healthy = network_ok && store_ok;
        if healthy {
            info!(
                active = stats.as_ref().map(|s| s.active_postings),
                added_today = stats.as_ref().map(|s| s.added_today),
                "Health check passed"
            );
        } else {
            warn!(
                network_ok = network_ok,
                store_ok = store_ok,
                "Health check failed"
            );
        }

        HealthReport {
            healthy,
            timestamp: now,
            network_ok,
            store_ok,
            stats,
            errors,
        }
    }

    async fn stats(&self) -> crate::Result<HealthStats> {
        let active_postings = self
            .repo
            .count(&PostingFilter::new().statuses(&[PostingStatus::Active]))
            .await?;
        let added_today = self
            .repo
            .count(
                &PostingFilter::new()
                    .auto_posted(true)
                    .created_at_or_after(self.time_provider.start_of_day_millis()),
            )
            .await?;

        Ok(HealthStats {
            active_postings,
            added_today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error_log::MemoryErrorLog;
    use crate::domain::{JobPosting, MS_PER_DAY};
    use crate::port::network_probe::mocks::MockNetworkProbe;
    use crate::port::posting_repository::mocks::InMemoryPostingRepository;
    use crate::port::time_provider::mocks::MockTimeProvider;

    // 2024-03-10T12:00:00Z
    const NOW: i64 = 1_710_072_000_000;

    fn monitor(
        repo: Arc<InMemoryPostingRepository>,
        probe: MockNetworkProbe,
        log: Arc<MemoryErrorLog>,
    ) -> HealthMonitor {
        HealthMonitor::new(
            repo,
            Arc::new(probe),
            log,
            Arc::new(MockTimeProvider::new(NOW)),
        )
    }

    #[tokio::test]
    async fn test_healthy_with_daily_stats() {
        let mut today = JobPosting::new("1", NOW - 3_600_000, "A", "Acme", "board");
        today.is_auto_posted = true;
        let mut yesterday = JobPosting::new("2", NOW - MS_PER_DAY, "B", "Acme", "board");
        yesterday.is_auto_posted = true;
        let mut closed = JobPosting::new("3", NOW, "C", "Acme", "board");
        closed.status = PostingStatus::Closed;
        let repo = Arc::new(InMemoryPostingRepository::with_postings(vec![
            today, yesterday, closed,
        ]));
        let log = Arc::new(MemoryErrorLog::new(50));

        let report = monitor(repo, MockNetworkProbe::reachable(), log.clone())
            .check()
            .await;

        assert!(report.healthy);
        assert_eq!(
            report.stats,
            Some(HealthStats {
                active_postings: 2,
                added_today: 1
            })
        );
        assert_eq!(log.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_logged_and_mark_unhealthy() {
        let repo = Arc::new(InMemoryPostingRepository::new());
        repo.set_unavailable(true);
        let log = Arc::new(MemoryErrorLog::new(50));

        let report = monitor(repo, MockNetworkProbe::unreachable("dns failure"), log.clone())
            .check()
            .await;

        assert!(!report.healthy);
        assert!(!report.network_ok);
        assert!(!report.store_ok);
        assert_eq!(report.stats, None);

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.task == TaskKind::HealthCheck));
        assert!(entries.iter().any(|e| e.message.contains("dns failure")));
    }

    #[tokio::test]
    async fn test_network_down_store_up_is_unhealthy() {
        let repo = Arc::new(InMemoryPostingRepository::new());
        let log = Arc::new(MemoryErrorLog::new(50));

        let report = monitor(repo, MockNetworkProbe::unreachable("timeout"), log)
            .check()
            .await;

        assert!(!report.healthy);
        assert!(report.store_ok);
        assert!(report.stats.is_some());
    }

    #[tokio::test]
    async fn test_recovers_and_rolls_daily_window() {
        let mut today = JobPosting::new("1", NOW, "A", "Acme", "board");
        today.is_auto_posted = true;
        let repo = Arc::new(InMemoryPostingRepository::with_postings(vec![today]));
        let probe = Arc::new(MockNetworkProbe::unreachable("timeout"));
        let clock = Arc::new(MockTimeProvider::new(NOW));
        let monitor = HealthMonitor::new(
            repo,
            probe.clone(),
            Arc::new(MemoryErrorLog::new(50)),
            clock.clone(),
        );

        assert!(!monitor.check().await.healthy);

        probe.set_reachable(true);
        clock.advance(MS_PER_DAY);
        let report = monitor.check().await;

        assert!(report.healthy);
        assert_eq!(report.stats.map(|s| s.added_today), Some(0));
    }
}
