// Pipeline configuration (loaded once at startup, not runtime-mutable)
//
// All sections deserialize with defaults so a partial config file is enough.

use crate::domain::{TaskKind, MS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cron expressions (6 fields, seconds first) for the five scheduled tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub scrape: String,
    pub cleanup: String,
    pub status_update: String,
    pub health_check: String,
    pub error_trim: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scrape: "0 0 2 * * *".to_string(),        // daily 02:00
            cleanup: "0 5 2 * * *".to_string(),       // 5 minutes after scrape
            status_update: "0 10 2 * * *".to_string(), // 10 minutes after scrape
            health_check: "0 0 */6 * * *".to_string(), // every 6 hours
            error_trim: "0 0 3 * * Sun".to_string(),  // weekly
        }
    }
}

impl ScheduleConfig {
    pub fn expression(&self, kind: TaskKind) -> &str {
        match kind {
            TaskKind::Scrape => &self.scrape,
            TaskKind::Cleanup => &self.cleanup,
            TaskKind::StatusUpdate => &self.status_update,
            TaskKind::HealthCheck => &self.health_check,
            TaskKind::ErrorTrim => &self.error_trim,
        }
    }
}

/// Fetch retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Delay after failed attempt `n` is `base_delay_ms * 2^n`
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Per-source request spacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub min_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { min_delay_ms: 2000 }
    }
}

impl RateLimitConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

/// Politeness inside a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Queries of one source fetched concurrently
    pub query_batch_size: usize,
    /// Pause between query batches
    pub query_batch_delay_ms: u64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            query_batch_size: 2,
            query_batch_delay_ms: 3000,
        }
    }
}

/// Dedup/persist behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// A re-seen posting older than this is refreshed instead of skipped
    pub refresh_after_days: i64,
    /// New deadline granted on refresh and when a listing carries none
    pub deadline_extension_days: i64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay_ms: 1000,
            refresh_after_days: 7,
            deadline_extension_days: 30,
        }
    }
}

impl PersistConfig {
    pub fn refresh_after_ms(&self) -> i64 {
        self.refresh_after_days * MS_PER_DAY
    }

    pub fn deadline_extension_ms(&self) -> i64 {
        self.deadline_extension_days * MS_PER_DAY
    }
}

/// Status transitions and cleanup thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub expiring_window_days: i64,
    pub hard_delete_after_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            expiring_window_days: 7,
            hard_delete_after_days: 90,
        }
    }
}

/// Bounded error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    pub capacity: usize,
    pub retention_days: i64,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            retention_days: 7,
        }
    }
}

/// Everything the pipeline services need
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schedule: ScheduleConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub aggregate: AggregateConfig,
    pub persist: PersistConfig,
    pub lifecycle: LifecycleConfig,
    pub error_log: ErrorLogConfig,
}
