//! Shared harness: every pipeline service wired over in-memory SQLite

#![allow(dead_code)]

use jobsync_core::application::{
    Aggregator, HealthMonitor, LifecycleManager, PostingPersister, RateLimiter, RetryPolicy,
    Scheduler, SourceRegistry, TaskRunner,
};
use jobsync_core::config::{
    AggregateConfig, ErrorLogConfig, LifecycleConfig, PersistConfig, ScheduleConfig,
};
use jobsync_core::domain::{JobPosting, MS_PER_DAY};
use jobsync_core::port::id_provider::mocks::SequentialIdProvider;
use jobsync_core::port::network_probe::mocks::MockNetworkProbe;
use jobsync_core::port::time_provider::mocks::MockTimeProvider;
use jobsync_core::port::PostingRepository;
use jobsync_infra_sqlite::{create_pool, run_migrations, SqliteErrorLog, SqlitePostingRepository};
use std::sync::Arc;
use std::time::Duration;

/// Fixed "now" for every test (2023-11-14)
pub const NOW: i64 = 1_700_000_000_000;

pub struct Pipeline {
    pub repo: Arc<SqlitePostingRepository>,
    pub error_log: Arc<SqliteErrorLog>,
    pub time: Arc<MockTimeProvider>,
    pub aggregator: Arc<Aggregator>,
    pub scheduler: Arc<Scheduler>,
}

/// Retries without backoff and no request spacing, so tests run in real time
pub async fn pipeline(registry: SourceRegistry) -> Pipeline {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let time = Arc::new(MockTimeProvider::new(NOW));
    let repo = Arc::new(SqlitePostingRepository::new(pool.clone()));
    let error_log = Arc::new(SqliteErrorLog::new(pool, 50));

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
        RetryPolicy::new(3, Duration::ZERO),
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
        repo.clone(),
        Arc::new(MockNetworkProbe::reachable()),
        error_log.clone(),
        time.clone(),
    ));
    let runner = Arc::new(TaskRunner::new(
        aggregator.clone(),
        lifecycle,
        health,
        error_log.clone(),
        time.clone(),
        ErrorLogConfig::default(),
    ));

    Pipeline {
        repo,
        error_log,
        time,
        aggregator,
        scheduler: Arc::new(Scheduler::new(runner, ScheduleConfig::default())),
    }
}

/// Auto-posted record as a scrape would have stored it
pub fn stored(id: &str, source: &str, source_id: &str, title: &str, created_at: i64) -> JobPosting {
    let mut posting = JobPosting::new(id, created_at, title, "Acme", source);
    posting.source_id = Some(source_id.to_string());
    posting.application_deadline = Some(created_at + 30 * MS_PER_DAY);
    posting.is_auto_posted = true;
    posting
}

pub async fn seed(repo: &SqlitePostingRepository, postings: &[JobPosting]) {
    for posting in postings {
        repo.insert(posting).await.unwrap();
    }
}
