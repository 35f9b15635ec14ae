//! RPC Method Handlers
//!
//! Task triggers never fail at the RPC level: a rejected or failed run is a
//! `success: false` envelope. Queries and restarts surface store or config
//! failures as JSON-RPC errors.

use crate::error::to_rpc_error;
use crate::types::Envelope;
use jobsync_core::application::Scheduler;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// RPC Handler over the shared scheduler
pub struct RpcHandler {
    scheduler: Arc<Scheduler>,
}

impl RpcHandler {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    /// pipeline.scrape.v1
    pub async fn scrape(&self) -> Envelope {
        self.scheduler.trigger_scraping().await.into()
    }

    /// pipeline.cleanup.v1
    pub async fn cleanup(&self) -> Envelope {
        self.scheduler.trigger_cleanup().await.into()
    }

    /// pipeline.status_update.v1
    pub async fn status_update(&self) -> Envelope {
        self.scheduler.trigger_status_update().await.into()
    }

    /// pipeline.error_trim.v1
    pub async fn error_trim(&self) -> Envelope {
        self.scheduler.trigger_error_trim().await.into()
    }

    /// system.health.v1
    pub async fn health(&self) -> Envelope {
        self.scheduler.trigger_health_check().await.into()
    }

    /// scheduler.status.v1
    pub async fn status(&self) -> Result<Envelope, ErrorObjectOwned> {
        let status = self.scheduler.status().await;
        let data = serde_json::to_value(status).map_err(|e| to_rpc_error(e.into()))?;
        Ok(Envelope::data(data))
    }

    /// scheduler.statistics.v1
    pub async fn statistics(&self) -> Result<Envelope, ErrorObjectOwned> {
        let stats = self.scheduler.statistics().await.map_err(to_rpc_error)?;
        let data = serde_json::to_value(stats).map_err(|e| to_rpc_error(e.into()))?;
        Ok(Envelope::data(data))
    }

    /// scheduler.restart.v1
    pub async fn restart(&self) -> Result<Envelope, ErrorObjectOwned> {
        let started = Instant::now();
        self.scheduler.restart().await.map_err(to_rpc_error)?;
        info!("Scheduler restarted via RPC");
        Ok(Envelope::message(
            "Scheduler restarted",
            started.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jobsync_core::application::{
        Aggregator, HealthMonitor, LifecycleManager, MemoryErrorLog, PostingPersister,
        RateLimiter, RetryPolicy, SourceRegistry, TaskRunner,
    };
    use jobsync_core::config::{
        AggregateConfig, ErrorLogConfig, LifecycleConfig, PersistConfig, ScheduleConfig,
    };
    use jobsync_core::domain::MS_PER_DAY;
    use jobsync_core::port::id_provider::mocks::SequentialIdProvider;
    use jobsync_core::port::network_probe::mocks::MockNetworkProbe;
    use jobsync_core::port::posting_repository::mocks::InMemoryPostingRepository;
    use jobsync_core::port::source::mocks::{listing, ScriptedSource};
    use jobsync_core::port::time_provider::mocks::MockTimeProvider;
    use jobsync_core::port::TimeProvider;
    use std::time::Duration;
    use tokio_test::assert_ok;

    const NOW: i64 = 2_000 * MS_PER_DAY;

    pub(crate) fn scheduler(probe: MockNetworkProbe, schedule: ScheduleConfig) -> Arc<Scheduler> {
        let time: Arc<dyn TimeProvider> = Arc::new(MockTimeProvider::new(NOW));
        let repo = Arc::new(InMemoryPostingRepository::new());
        let error_log = Arc::new(MemoryErrorLog::new(50));
        let registry = SourceRegistry::new().with(Arc::new(ScriptedSource::returning(
            "board",
            vec![listing(0, "1", "Backend Intern", "Acme")],
        )));

        let persister = Arc::new(PostingPersister::new(
            repo.clone(),
            time.clone(),
            PersistConfig {
                batch_delay_ms: 0,
                ..Default::default()
            },
        ));
        let aggregator = Arc::new(Aggregator::new(
            registry,
            persister,
            RetryPolicy::new(1, Duration::ZERO),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            Arc::new(SequentialIdProvider::new()),
            time.clone(),
            AggregateConfig {
                query_batch_delay_ms: 0,
                ..Default::default()
            },
            30 * MS_PER_DAY,
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            repo.clone(),
            time.clone(),
            LifecycleConfig::default(),
        ));
        let health = Arc::new(HealthMonitor::new(
            repo,
            Arc::new(probe),
            error_log.clone(),
            time.clone(),
        ));
        let runner = Arc::new(TaskRunner::new(
            aggregator,
            lifecycle,
            health,
            error_log,
            time,
            ErrorLogConfig::default(),
        ));

        Arc::new(Scheduler::new(runner, schedule))
    }

    fn handler(probe: MockNetworkProbe, schedule: ScheduleConfig) -> RpcHandler {
        RpcHandler::new(scheduler(probe, schedule))
    }

    #[tokio::test]
    async fn test_scrape_envelope_carries_run_result() {
        let handler = handler(MockNetworkProbe::reachable(), ScheduleConfig::default());

        let envelope = handler.scrape().await;

        assert!(envelope.success);
        assert!(envelope.duration_ms.is_some());
        let data = envelope.data.unwrap();
        assert_eq!(data["total_found"], 1);
        assert_eq!(data["total_added"], 1);
    }

    #[tokio::test]
    async fn test_unhealthy_check_is_unsuccessful_envelope() {
        let handler = handler(
            MockNetworkProbe::unreachable("dns failure"),
            ScheduleConfig::default(),
        );

        let envelope = handler.health().await;

        assert!(!envelope.success);
        assert!(envelope.error.is_some());
    }

    #[tokio::test]
    async fn test_statistics_counts_triggered_runs() {
        let handler = handler(MockNetworkProbe::reachable(), ScheduleConfig::default());
        handler.cleanup().await;
        handler.status_update().await;

        let envelope = assert_ok!(handler.statistics().await);

        let data = envelope.data.unwrap();
        assert_eq!(data["counters"]["cleanup_runs"], 1);
        assert_eq!(data["counters"]["status_update_runs"], 1);
        assert_eq!(data["counters"]["scrape_runs"], 0);
        assert!(data["postings"].is_object());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_restart_with_invalid_cron_is_rpc_error() {
        let schedule = ScheduleConfig {
            scrape: "whenever".to_string(),
            ..Default::default()
        };
        let handler = handler(MockNetworkProbe::reachable(), schedule);

        let err = handler.restart().await.unwrap_err();
        assert_eq!(err.code(), crate::error::code::INTERNAL_ERROR);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_status_lists_every_task() {
        let handler = handler(MockNetworkProbe::reachable(), ScheduleConfig::default());

        let envelope = assert_ok!(handler.status().await);

        let data = envelope.data.unwrap();
        assert_eq!(data["running"], false);
        assert_eq!(data["tasks"].as_array().unwrap().len(), 5);
    }
}
