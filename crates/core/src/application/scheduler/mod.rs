//! Scheduler - cron-driven orchestration of the five pipeline tasks
//!
//! Cron firings and manual triggers share one code path, `TaskRunner::run`:
//! claim the task kind's guard, run the body on its own tokio task, release
//! the guard when that task finishes or panics. A second invocation of the
//! same kind while one is in flight is rejected with "Already running".
//! Different kinds may overlap freely.

mod guard;

pub use guard::{TaskGuard, TaskToken};

use crate::application::aggregator::Aggregator;
use crate::application::health::HealthMonitor;
use crate::application::lifecycle::LifecycleManager;
use crate::config::{ErrorLogConfig, ScheduleConfig};
use crate::domain::{RunResult, TaskKind, MS_PER_DAY};
use crate::error::{AppError, Result};
use crate::port::{ErrorLog, ErrorLogEntry, StatusCounts, TimeProvider};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const ALREADY_RUNNING: &str = "Already running";

/// Error log entries included in statistics
const RECENT_ERRORS: usize = 10;

/// Result envelope of one task invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task: TaskKind,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn already_running(task: TaskKind) -> Self {
        Self {
            task,
            success: false,
            message: ALREADY_RUNNING.to_string(),
            data: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn is_already_running(&self) -> bool {
        !self.success && self.message == ALREADY_RUNNING
    }
}

/// What a task body reports back to the runner
struct TaskReport {
    success: bool,
    message: String,
    data: Option<Value>,
    error: Option<String>,
}

impl TaskReport {
    fn ok(message: String, data: Value) -> Self {
        Self {
            success: true,
            message,
            data: Some(data),
            error: None,
        }
    }

    fn partial(message: String, data: Value, error: String) -> Self {
        Self {
            success: false,
            message,
            data: Some(data),
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct TaskGuards {
    scrape: TaskGuard,
    cleanup: TaskGuard,
    status_update: TaskGuard,
    health_check: TaskGuard,
    error_trim: TaskGuard,
}

impl TaskGuards {
    fn get(&self, kind: TaskKind) -> &TaskGuard {
        match kind {
            TaskKind::Scrape => &self.scrape,
            TaskKind::Cleanup => &self.cleanup,
            TaskKind::StatusUpdate => &self.status_update,
            TaskKind::HealthCheck => &self.health_check,
            TaskKind::ErrorTrim => &self.error_trim,
        }
    }
}

/// Cumulative run counters (since process start)
#[derive(Debug, Default)]
struct TaskCounters {
    scrape: AtomicU64,
    cleanup: AtomicU64,
    status_update: AtomicU64,
    health_check: AtomicU64,
    error_trim: AtomicU64,
}

impl TaskCounters {
    fn bump(&self, kind: TaskKind) {
        let counter = match kind {
            TaskKind::Scrape => &self.scrape,
            TaskKind::Cleanup => &self.cleanup,
            TaskKind::StatusUpdate => &self.status_update,
            TaskKind::HealthCheck => &self.health_check,
            TaskKind::ErrorTrim => &self.error_trim,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RunCounters {
        RunCounters {
            scrape_runs: self.scrape.load(Ordering::Relaxed),
            cleanup_runs: self.cleanup.load(Ordering::Relaxed),
            status_update_runs: self.status_update.load(Ordering::Relaxed),
            health_checks: self.health_check.load(Ordering::Relaxed),
            error_trims: self.error_trim.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub scrape_runs: u64,
    pub cleanup_runs: u64,
    pub status_update_runs: u64,
    pub health_checks: u64,
    pub error_trims: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatistics {
    pub counters: RunCounters,
    pub last_scrape: Option<RunResult>,
    pub postings: StatusCounts,
    pub error_log_size: usize,
    /// Newest first
    pub recent_errors: Vec<ErrorLogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub task: TaskKind,
    pub schedule: String,
    pub in_flight: bool,
    /// Registered with the running cron engine
    pub scheduled: bool,
    /// Next cron firing (epoch ms), when the scheduler is running
    pub next_run: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub tasks: Vec<TaskStatus>,
}

/// Guarded, panic-isolated execution of task bodies
pub struct TaskRunner {
    aggregator: Arc<Aggregator>,
    lifecycle: Arc<LifecycleManager>,
    health: Arc<HealthMonitor>,
    error_log: Arc<dyn ErrorLog>,
    time_provider: Arc<dyn TimeProvider>,
    error_log_config: ErrorLogConfig,
    guards: TaskGuards,
    counters: TaskCounters,
    last_scrape: Mutex<Option<RunResult>>,
}

impl TaskRunner {
    pub fn new(
        aggregator: Arc<Aggregator>,
        lifecycle: Arc<LifecycleManager>,
        health: Arc<HealthMonitor>,
        error_log: Arc<dyn ErrorLog>,
        time_provider: Arc<dyn TimeProvider>,
        error_log_config: ErrorLogConfig,
    ) -> Self {
        Self {
            aggregator,
            lifecycle,
            health,
            error_log,
            time_provider,
            error_log_config,
            guards: TaskGuards::default(),
            counters: TaskCounters::default(),
            last_scrape: Mutex::new(None),
        }
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.guards.get(kind).is_running()
    }

    /// Run one task of `kind` unless one is already in flight
    ///
    /// Never panics and never returns an error: every failure, panics
    /// included, becomes an unsuccessful outcome plus an error log entry.
    pub async fn run(self: &Arc<Self>, kind: TaskKind) -> TaskOutcome {
        let Some(token) = self.guards.get(kind).try_acquire() else {
            info!(task = %kind, "Task already running, skipping");
            return TaskOutcome::already_running(kind);
        };

        info!(task = %kind, "Task started");
        let started = Instant::now();

        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            // Released when the body finishes or unwinds
            let _token = token;
            runner.execute(kind).await
        });
        let joined = handle.await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match joined {
            Ok(Ok(report)) => TaskOutcome {
                task: kind,
                success: report.success,
                message: report.message,
                data: report.data,
                error: report.error,
                duration_ms,
            },
            Ok(Err(e)) => {
                let message = e.to_string();
                self.record_failure(kind, None, &message).await;
                TaskOutcome {
                    task: kind,
                    success: false,
                    message: format!("{} failed", kind),
                    data: None,
                    error: Some(message),
                    duration_ms,
                }
            }
            Err(join_error) => {
                let message = format!("task panicked: {}", panic_message(join_error));
                self.record_failure(kind, None, &message).await;
                TaskOutcome {
                    task: kind,
                    success: false,
                    message: format!("{} failed", kind),
                    data: None,
                    error: Some(message),
                    duration_ms,
                }
            }
        };

        if outcome.success {
            info!(
                task = %kind,
                duration_ms = duration_ms,
                summary = %outcome.message,
                "Task completed"
            );
        } else {
            error!(
                task = %kind,
                duration_ms = duration_ms,
                error = outcome.error.as_deref().unwrap_or(""),
                "Task failed"
            );
        }

        outcome
    }

    async fn execute(&self, kind: TaskKind) -> Result<TaskReport> {
        self.counters.bump(kind);
        match kind {
            TaskKind::Scrape => self.scrape().await,
            TaskKind::Cleanup => self.cleanup().await,
            TaskKind::StatusUpdate => self.update_statuses().await,
            TaskKind::HealthCheck => self.health_check().await,
            TaskKind::ErrorTrim => self.trim_error_log().await,
        }
    }

    async fn scrape(&self) -> Result<TaskReport> {
        let result = self.aggregator.run().await;

        for failure in &result.errors {
            self.record_failure(TaskKind::Scrape, Some(&failure.source), &failure.error)
                .await;
        }

        let message = format!(
            "Found {} postings, added {} ({} source errors)",
            result.total_found,
            result.total_added,
            result.errors.len()
        );
        let data = serde_json::to_value(&result)?;
        *self
            .last_scrape
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(result);

        Ok(TaskReport::ok(message, data))
    }

    async fn cleanup(&self) -> Result<TaskReport> {
        let outcome = self.lifecycle.cleanup().await;

        for e in &outcome.errors {
            self.record_failure(TaskKind::Cleanup, None, e).await;
        }

        let message = format!(
            "Expired {} postings, deleted {}",
            outcome.expired_count, outcome.deleted_count
        );
        let data = serde_json::to_value(&outcome)?;
        if outcome.is_clean() {
            Ok(TaskReport::ok(message, data))
        } else {
            let error = outcome.errors.join("; ");
            Ok(TaskReport::partial(message, data, error))
        }
    }

    async fn update_statuses(&self) -> Result<TaskReport> {
        let outcome = self.lifecycle.update_statuses().await?;
        let message = format!(
            "Marked {} expiring soon, closed {}",
            outcome.expiring_soon, outcome.closed
        );
        Ok(TaskReport::ok(message, serde_json::to_value(&outcome)?))
    }

    /// Failures are already written to the error log by the monitor
    async fn health_check(&self) -> Result<TaskReport> {
        let report = self.health.check().await;
        let data = serde_json::to_value(&report)?;
        if report.healthy {
            Ok(TaskReport::ok("Healthy".to_string(), data))
        } else {
            let error = report.errors.join("; ");
            Ok(TaskReport::partial("Unhealthy".to_string(), data, error))
        }
    }

    async fn trim_error_log(&self) -> Result<TaskReport> {
        let cutoff = self.time_provider.now_millis()
            - self.error_log_config.retention_days * MS_PER_DAY;
        let removed = self.error_log.prune_older_than(cutoff).await?;
        Ok(TaskReport::ok(
            format!("Pruned {} error log entries", removed),
            serde_json::json!({ "removed": removed }),
        ))
    }

    async fn record_failure(&self, kind: TaskKind, source: Option<&str>, message: &str) {
        let mut entry = ErrorLogEntry::new(self.time_provider.now_millis(), kind, message);
        if let Some(source) = source {
            entry = entry.with_source(source);
        }
        if let Err(e) = self.error_log.record(entry).await {
            warn!(task = %kind, error = %e, "Failed to record task failure");
        }
    }

    pub async fn statistics(&self) -> Result<SchedulerStatistics> {
        let last_scrape = self
            .last_scrape
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        Ok(SchedulerStatistics {
            counters: self.counters.snapshot(),
            last_scrape,
            postings: self.lifecycle.status_counts().await?,
            error_log_size: self.error_log.len().await?,
            recent_errors: self.error_log.recent(RECENT_ERRORS).await?,
        })
    }
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

struct CronHandle {
    scheduler: JobScheduler,
    jobs: Vec<(TaskKind, Uuid)>,
}

/// Owns the cron registrations and exposes the manual triggers
pub struct Scheduler {
    runner: Arc<TaskRunner>,
    schedule: ScheduleConfig,
    cron: tokio::sync::Mutex<Option<CronHandle>>,
}

impl Scheduler {
    pub fn new(runner: Arc<TaskRunner>, schedule: ScheduleConfig) -> Self {
        Self {
            runner,
            schedule,
            cron: tokio::sync::Mutex::new(None),
        }
    }

    pub fn runner(&self) -> &Arc<TaskRunner> {
        &self.runner
    }

    /// Register the cron jobs and start firing them
    ///
    /// A task whose expression does not parse is skipped and recorded in the
    /// error log; the other tasks are still scheduled and the scheduler counts
    /// as started.
    ///
    /// # Errors
    /// `AppError::Config` naming the skipped tasks (the valid ones keep firing),
    /// `AppError::Scheduler` if the cron engine cannot start
    pub async fn start(&self) -> Result<()> {
        let mut cron = self.cron.lock().await;
        if cron.is_some() {
            warn!("Scheduler already started");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;
        let mut jobs = Vec::with_capacity(TaskKind::ALL.len());
        let mut invalid = Vec::new();

        for kind in TaskKind::ALL {
            let expression = self.schedule.expression(kind);
            let runner = Arc::clone(&self.runner);
            let job = Job::new_async(expression, move |_uuid, _lock| {
                let runner = Arc::clone(&runner);
                Box::pin(async move {
                    debug!(task = %kind, "Cron fired");
                    runner.run(kind).await;
                })
            });

            match job {
                Ok(job) => {
                    let id = scheduler.add(job).await?;
                    jobs.push((kind, id));
                }
                Err(e) => {
                    let message = format!("invalid cron expression '{}': {}", expression, e);
                    error!(task = %kind, error = %message, "Task not scheduled");
                    self.runner.record_failure(kind, None, &message).await;
                    invalid.push(format!("{} ({})", kind, expression));
                }
            }
        }

        scheduler.start().await?;

        info!(
            scheduled = jobs.len(),
            skipped = invalid.len(),
            scrape = %self.schedule.scrape,
            cleanup = %self.schedule.cleanup,
            status_update = %self.schedule.status_update,
            health_check = %self.schedule.health_check,
            error_trim = %self.schedule.error_trim,
            "Scheduler started"
        );

        *cron = Some(CronHandle { scheduler, jobs });

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "invalid cron expression for {}",
                invalid.join(", ")
            )))
        }
    }

    /// Stop cron firings; in-flight runs finish on their own
    pub async fn stop(&self) -> Result<()> {
        let mut cron = self.cron.lock().await;
        if let Some(mut handle) = cron.take() {
            handle.scheduler.shutdown().await?;
            info!("Scheduler stopped");
        }
        Ok(())
    }

    pub async fn restart(&self) -> Result<()> {
        info!("Restarting scheduler");
        self.stop().await?;
        self.start().await
    }

    pub async fn is_started(&self) -> bool {
        self.cron.lock().await.is_some()
    }

    pub async fn trigger_scraping(&self) -> TaskOutcome {
        self.runner.run(TaskKind::Scrape).await
    }

    pub async fn trigger_cleanup(&self) -> TaskOutcome {
        self.runner.run(TaskKind::Cleanup).await
    }

    pub async fn trigger_status_update(&self) -> TaskOutcome {
        self.runner.run(TaskKind::StatusUpdate).await
    }

    pub async fn trigger_health_check(&self) -> TaskOutcome {
        self.runner.run(TaskKind::HealthCheck).await
    }

    pub async fn trigger_error_trim(&self) -> TaskOutcome {
        self.runner.run(TaskKind::ErrorTrim).await
    }

    /// Guard states, schedules and next-run estimates
    pub async fn status(&self) -> SchedulerStatus {
        let mut cron = self.cron.lock().await;
        let running = cron.is_some();
        let mut tasks = Vec::with_capacity(TaskKind::ALL.len());

        for kind in TaskKind::ALL {
            let mut next_run = None;
            let mut scheduled = false;
            if let Some(handle) = cron.as_mut() {
                let job_id = handle
                    .jobs
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map(|(_, id)| *id);
                if let Some(id) = job_id {
                    scheduled = true;
                    match handle.scheduler.next_tick_for_job(id).await {
                        Ok(tick) => next_run = tick.map(|t| t.timestamp_millis()),
                        Err(e) => debug!(task = %kind, error = %e, "Next tick unavailable"),
                    }
                }
            }

            tasks.push(TaskStatus {
                task: kind,
                schedule: self.schedule.expression(kind).to_string(),
                in_flight: self.runner.is_running(kind),
                scheduled,
                next_run,
            });
        }

        SchedulerStatus { running, tasks }
    }

    pub async fn statistics(&self) -> Result<SchedulerStatistics> {
        self.runner.statistics().await
    }
}
