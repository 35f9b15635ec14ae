//! jobsync daemon - Main Entry Point
//!
//! Composition root: configuration, database, sources, pipeline services,
//! cron scheduler and the JSON-RPC control surface.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use crate::config::DaemonConfig;
use jobsync_api_rpc::RpcServer;
use jobsync_core::application::{
    Aggregator, HealthMonitor, LifecycleManager, PostingPersister, RateLimiter, RetryPolicy,
    Scheduler, TaskRunner,
};
use jobsync_core::domain::TaskKind;
use jobsync_core::port::id_provider::UuidProvider;
use jobsync_core::port::time_provider::SystemTimeProvider;
use jobsync_core::port::{ErrorLog, ErrorLogEntry, IdProvider, PostingRepository, TimeProvider};
use jobsync_infra_sqlite::{create_pool, run_migrations, SqliteErrorLog, SqlitePostingRepository};
use jobsync_infra_web::{build_client, load_sources, presets, HttpNetworkProbe};
use std::sync::Arc;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    telemetry::init_tracing()?;
    info!("jobsync v{} starting...", VERSION);
    if telemetry::otlp_endpoint().is_some() && !telemetry::OTEL_COMPILED_IN {
        warn!("OTEL_EXPORTER_OTLP_ENDPOINT set but feature 'telemetry' not enabled");
    }

    // 2. Configuration
    let config = DaemonConfig::load().context("Failed to load configuration")?;

    // 3. Database
    info!(database_url = %config.database_url, "Initializing database...");
    let pool = create_pool(&config.database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Adapters
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let repo: Arc<dyn PostingRepository> = Arc::new(SqlitePostingRepository::new(pool.clone()));
    let error_log: Arc<dyn ErrorLog> = Arc::new(SqliteErrorLog::new(
        pool.clone(),
        config.pipeline.error_log.capacity,
    ));
    let http = build_client(&config.http).context("HTTP client setup failed")?;

    // 5. Sources (an invalid spec disables only itself)
    let specs = if config.sources.is_empty() {
        info!("No sources configured, using built-in presets");
        presets::builtin_sources()
    } else {
        config.sources.clone()
    };
    let loaded = load_sources(specs, &http, config.http.timeout_secs);
    for (name, e) in &loaded.rejected {
        let entry = ErrorLogEntry::new(
            time_provider.now_millis(),
            TaskKind::Scrape,
            format!("source disabled: {}", e),
        )
        .with_source(name);
        if let Err(e) = error_log.record(entry).await {
            warn!(source = %name, error = %e, "Failed to record disabled source");
        }
    }
    if loaded.registry.is_empty() {
        warn!("No usable sources; scrape runs will find nothing");
    }

    // 6. Pipeline services
    let pipeline = &config.pipeline;
    let persister = Arc::new(PostingPersister::new(
        repo.clone(),
        time_provider.clone(),
        pipeline.persist.clone(),
    ));
    let aggregator = Arc::new(Aggregator::new(
        loaded.registry,
        persister,
        RetryPolicy::from_config(&pipeline.retry),
        Arc::new(RateLimiter::new(pipeline.rate_limit.min_delay())),
        id_provider,
        time_provider.clone(),
        pipeline.aggregate.clone(),
        pipeline.persist.deadline_extension_ms(),
    ));
    info!(sources = ?aggregator.source_names(), "Sources registered");
    let lifecycle = Arc::new(LifecycleManager::new(
        repo.clone(),
        time_provider.clone(),
        pipeline.lifecycle.clone(),
    ));
    let health = Arc::new(HealthMonitor::new(
        repo,
        Arc::new(HttpNetworkProbe::new(http, &config.health)),
        error_log.clone(),
        time_provider.clone(),
    ));
    let runner = Arc::new(TaskRunner::new(
        aggregator,
        lifecycle,
        health,
        error_log,
        time_provider,
        pipeline.error_log.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(runner, pipeline.schedule.clone()));

    // 7. Cron scheduler (a bad schedule leaves the control surface up)
    if let Err(e) = scheduler.start().await {
        error!(
            error = %e,
            "Scheduler started with errors; fix the schedule and call scheduler.restart.v1"
        );
    }

    // 8. JSON-RPC server
    let rpc_handle = RpcServer::new(config.rpc.clone(), scheduler.clone())
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!("System ready. Press Ctrl+C to shutdown");

    // 9. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 10. Graceful shutdown
    if let Err(e) = scheduler.stop().await {
        error!(error = %e, "Scheduler stop failed");
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}
