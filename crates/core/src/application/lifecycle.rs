// Lifecycle Manager
// Ages postings by deadline and purges old auto-posted records.

use crate::config::LifecycleConfig;
use crate::domain::{PostingStatus, MS_PER_DAY};
use crate::error::Result;
use crate::port::{PostingChanges, PostingFilter, PostingRepository, StatusCounts, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Counts from a status-update pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusUpdateOutcome {
    pub expiring_soon: u64,
    pub closed: u64,
}

/// Counts from a cleanup pass
///
/// The two phases are independent: a failure in one is recorded in `errors`
/// and the other still runs. Partial completion is reflected in the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub expired_count: u64,
    pub deleted_count: u64,
    pub errors: Vec<String>,
}

impl CleanupOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lifecycle manager
pub struct LifecycleManager {
    repo: Arc<dyn PostingRepository>,
    time_provider: Arc<dyn TimeProvider>,
    config: LifecycleConfig,
}

impl LifecycleManager {
    pub fn new(
        repo: Arc<dyn PostingRepository>,
        time_provider: Arc<dyn TimeProvider>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repo,
            time_provider,
            config,
        }
    }

    /// Advance statuses by deadline
    ///
    /// - active/expiring_soon with `deadline < now` -> closed
    /// - active with `now <= deadline < now + window` -> expiring_soon
    pub async fn update_statuses(&self) -> Result<StatusUpdateOutcome> {
        let now = self.time_provider.now_millis();
        let window_end = now + self.config.expiring_window_days * MS_PER_DAY;

        let closed = self
            .repo
            .update_where(
                &PostingFilter::new()
                    .statuses(&PostingStatus::predecessors(PostingStatus::Closed))
                    .deadline_before(now),
                &PostingChanges::status(PostingStatus::Closed, now),
            )
            .await?;

        let expiring_soon = self
            .repo
            .update_where(
                &PostingFilter::new()
                    .statuses(&PostingStatus::predecessors(PostingStatus::ExpiringSoon))
                    .deadline_at_or_after(now)
                    .deadline_before(window_end),
                &PostingChanges::status(PostingStatus::ExpiringSoon, now),
            )
            .await?;

        info!(
            expiring_soon = expiring_soon,
            closed = closed,
            "Status update completed"
        );

        Ok(StatusUpdateOutcome {
            expiring_soon,
            closed,
        })
    }

    /// Run both cleanup phases (auto-posted records only)
    pub async fn cleanup(&self) -> CleanupOutcome {
        let mut outcome = CleanupOutcome::default();

        match self.soft_delete().await {
            Ok(count) => outcome.expired_count = count,
            Err(e) => {
                error!(error = %e, "Soft delete phase failed");
                outcome.errors.push(format!("soft delete: {}", e));
            }
        }

        match self.hard_delete().await {
            Ok(count) => outcome.deleted_count = count,
            Err(e) => {
                error!(error = %e, "Hard delete phase failed");
                outcome.errors.push(format!("hard delete: {}", e));
            }
        }

        info!(
            expired = outcome.expired_count,
            deleted = outcome.deleted_count,
            errors = outcome.errors.len(),
            "Cleanup completed"
        );

        outcome
    }

    /// Mark open auto-posted postings past their deadline as expired
    pub async fn soft_delete(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        self.repo
            .update_where(
                &PostingFilter::new()
                    .auto_posted(true)
                    .statuses(&PostingStatus::predecessors(PostingStatus::Expired))
                    .deadline_before(now),
                &PostingChanges::status(PostingStatus::Expired, now),
            )
            .await
    }

    pub async fn status_counts(&self) -> Result<StatusCounts> {
        self.repo.count_by_status().await
    }

    /// Permanently remove auto-posted postings past their deadline and older
    /// than the hard-delete age. Manually created postings are never matched.
    pub async fn hard_delete(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let created_cutoff = now - self.config.hard_delete_after_days * MS_PER_DAY;

        self.repo
            .delete_where(
                &PostingFilter::new()
                    .auto_posted(true)
                    .deadline_before(now)
                    .created_before(created_cutoff),
            )
            .await
    }
}
