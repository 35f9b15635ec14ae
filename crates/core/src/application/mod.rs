// Application Layer - Use Cases and Business Logic

pub mod aggregator;
pub mod error_log;
pub mod health;
pub mod lifecycle;
pub mod normalize;
pub mod persister;
pub mod rate_limiter;
pub mod retry;
pub mod scheduler;
pub mod source_registry;

// Re-exports
pub use aggregator::{Aggregator, SourceReport};
pub use error_log::MemoryErrorLog;
pub use health::{HealthMonitor, HealthReport, HealthStats};
pub use lifecycle::{CleanupOutcome, LifecycleManager, StatusUpdateOutcome};
pub use persister::{PersistOutcome, PostingPersister, SaveOutcome};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use scheduler::{
    RunCounters, Scheduler, SchedulerStatistics, SchedulerStatus, TaskOutcome, TaskRunner,
    TaskStatus, ALREADY_RUNNING,
};
pub use source_registry::SourceRegistry;
