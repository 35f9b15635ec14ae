// Deduplicator / Persister
// Upserts normalized candidates in bounded batches; idempotent across runs.

use crate::config::PersistConfig;
use crate::domain::JobPosting;
use crate::error::Result;
use crate::port::{PostingRepository, TimeProvider};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// Stale existing record re-activated with fresh timestamps
    Refreshed,
    /// Recently seen; left untouched
    Duplicate,
}

/// Aggregate of one `persist` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub refreshed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl PersistOutcome {
    /// Inserts plus refreshes (both reported as "added")
    pub fn added(&self) -> usize {
        self.inserted + self.refreshed
    }
}

/// Deduplicating persister
pub struct PostingPersister {
    repo: Arc<dyn PostingRepository>,
    time_provider: Arc<dyn TimeProvider>,
    config: PersistConfig,
}

impl PostingPersister {
    pub fn new(
        repo: Arc<dyn PostingRepository>,
        time_provider: Arc<dyn TimeProvider>,
        config: PersistConfig,
    ) -> Self {
        Self {
            repo,
            time_provider,
            config,
        }
    }

    /// Persist candidates in batches of `batch_size`
    ///
    /// Saves inside a batch run concurrently and independently: one failure is
    /// counted and logged, never retried, and never blocks the others.
    pub async fn persist(&self, candidates: Vec<JobPosting>) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        // The same listing can show up under several queries of one run
        let mut seen = HashSet::new();
        let candidates: Vec<JobPosting> = candidates
            .into_iter()
            .filter(|c| {
                let key = match &c.source_id {
                    Some(source_id) => format!("{}\u{1f}{}", c.source, source_id),
                    None => format!("{}\u{1f}{}\u{1f}{}", c.source, c.title, c.company),
                };
                let first = seen.insert(key);
                if !first {
                    outcome.duplicates += 1;
                }
                first
            })
            .collect();

        let batch_size = self.config.batch_size.max(1);
        let batch_delay = Duration::from_millis(self.config.batch_delay_ms);

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if index > 0 && !batch_delay.is_zero() {
                tokio::time::sleep(batch_delay).await;
            }

            let results = join_all(batch.iter().map(|c| self.save_one(c))).await;

            for (candidate, result) in batch.iter().zip(results) {
                match result {
                    Ok(SaveOutcome::Inserted) => outcome.inserted += 1,
                    Ok(SaveOutcome::Refreshed) => outcome.refreshed += 1,
                    Ok(SaveOutcome::Duplicate) => outcome.duplicates += 1,
                    Err(e) => {
                        warn!(
                            source = %candidate.source,
                            title = %candidate.title,
                            error = %e,
                            "Failed to save posting"
                        );
                        outcome.failed += 1;
                        outcome
                            .errors
                            .push(format!("{} @ {}: {}", candidate.title, candidate.company, e));
                    }
                }
            }
        }

        info!(
            inserted = outcome.inserted,
            refreshed = outcome.refreshed,
            duplicates = outcome.duplicates,
            failed = outcome.failed,
            "Persist completed"
        );

        outcome
    }

    /// Dedup and save one candidate
    ///
    /// Lookup order: `(source, source_id)`, then `(title, company, source)`.
    pub async fn save_one(&self, candidate: &JobPosting) -> Result<SaveOutcome> {
        let existing = match &candidate.source_id {
            Some(source_id) => {
                self.repo
                    .find_by_source_id(&candidate.source, source_id)
                    .await?
            }
            None => None,
        };
        let existing = match existing {
            Some(posting) => Some(posting),
            None => {
                self.repo
                    .find_by_title_company_source(
                        &candidate.title,
                        &candidate.company,
                        &candidate.source,
                    )
                    .await?
            }
        };

        let Some(mut existing) = existing else {
            self.repo.insert(candidate).await?;
            debug!(source = %candidate.source, title = %candidate.title, "Inserted posting");
            return Ok(SaveOutcome::Inserted);
        };

        // Business-rule assumption: a listing re-seen after going stale is
        // treated as re-posted. Concurrent rescrapes of the same record may
        // both refresh it; the result is the same timestamps either way.
        let now = self.time_provider.now_millis();
        if existing.age_ms(now) > self.config.refresh_after_ms() {
            existing.refresh(now, self.config.deadline_extension_ms());
            self.repo.update(&existing).await?;
            debug!(id = %existing.id, "Refreshed stale posting");
            Ok(SaveOutcome::Refreshed)
        } else {
            Ok(SaveOutcome::Duplicate)
        }
    }
}
