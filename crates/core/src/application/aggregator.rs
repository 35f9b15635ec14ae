//! Aggregator - runs every registered source concurrently with settle-all semantics
//!
//! Each source runs on its own tokio task. Inside a source, queries are fetched in
//! small batches (politeness), each fetch wrapped by the RateLimiter and the
//! RetryPolicy. A source whose fetches exhaust their retries, or that panics,
//! only shrinks its own contribution to the RunResult.

use crate::application::persister::PostingPersister;
use crate::application::rate_limiter::RateLimiter;
use crate::application::retry::RetryPolicy;
use crate::application::source_registry::SourceRegistry;
use crate::config::AggregateConfig;
use crate::domain::{JobPosting, RawListing, RunResult, SourceStats};
use crate::port::{FetchError, IdProvider, JobSource, NormalizeContext, TimeProvider};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one source within a run
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub source: String,
    pub stats: SourceStats,
    pub failures: Vec<String>,
}

pub struct Aggregator {
    registry: SourceRegistry,
    persister: Arc<PostingPersister>,
    retry: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: AggregateConfig,
    default_deadline_ms: i64,
}

impl Aggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: SourceRegistry,
        persister: Arc<PostingPersister>,
        retry: RetryPolicy,
        rate_limiter: Arc<RateLimiter>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: AggregateConfig,
        default_deadline_ms: i64,
    ) -> Self {
        Self {
            registry,
            persister,
            retry,
            rate_limiter,
            id_provider,
            time_provider,
            config,
            default_deadline_ms,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Scrape all sources and persist what they found
    pub async fn run(self: &Arc<Self>) -> RunResult {
        let mut run = RunResult::started(self.time_provider.now_millis());
        info!(sources = self.registry.len(), "Aggregate scrape started");

        let handles: Vec<_> = self
            .registry
            .iter()
            .map(|source| {
                let this = Arc::clone(self);
                let source = Arc::clone(source);
                tokio::spawn(async move { this.scrape_source(source.as_ref()).await })
            })
            .collect();
        let names = self.registry.names();

        for (name, joined) in names.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(report) => run.record_source(report.source, report.stats, report.failures),
                Err(join_err) => {
                    error!(source = %name, error = %join_err, "Source task aborted");
                    run.record_source(
                        name,
                        SourceStats {
                            errors: 1,
                            ..Default::default()
                        },
                        vec![format!("source task aborted: {}", join_err)],
                    );
                }
            }
        }

        run.finish(self.time_provider.now_millis());
        info!(
            total_found = run.total_found,
            total_added = run.total_added,
            errors = run.errors.len(),
            duration_ms = run.duration_ms,
            "Aggregate scrape completed"
        );
        run
    }

    /// Fetch, normalize and persist one source
    pub async fn scrape_source(&self, source: &dyn JobSource) -> SourceReport {
        let mut report = SourceReport {
            source: source.name().to_string(),
            ..Default::default()
        };

        let mut queries = source.queries();
        if queries.is_empty() {
            queries.push(String::new());
        }

        let batch_size = self.config.query_batch_size.max(1);
        let batch_delay = Duration::from_millis(self.config.query_batch_delay_ms);
        let mut candidates: Vec<JobPosting> = Vec::new();

        for (index, batch) in queries.chunks(batch_size).enumerate() {
            if index > 0 && !batch_delay.is_zero() {
                tokio::time::sleep(batch_delay).await;
            }

            let results = join_all(batch.iter().map(|q| self.fetch_query(source, q))).await;

            for (query, result) in batch.iter().zip(results) {
                match result {
                    Ok(listings) => {
                        let fetched_at = self.time_provider.now_millis();
                        candidates.extend(self.normalize_all(
                            source,
                            query,
                            fetched_at,
                            &listings,
                            &mut report.stats,
                        ));
                    }
                    Err(e) => {
                        warn!(
                            source = %source.name(),
                            query = %query,
                            error = %e,
                            "Query failed after retries"
                        );
                        report.stats.errors += 1;
                        report.failures.push(if query.is_empty() {
                            e.to_string()
                        } else {
                            format!("{} (query '{}')", e, query)
                        });
                    }
                }
            }
        }

        report.stats.found = candidates.len();

        if !candidates.is_empty() {
            let outcome = self.persister.persist(candidates).await;
            report.stats.added = outcome.added();
            report.stats.failed_saves = outcome.failed;
        }

        info!(
            source = %report.source,
            found = report.stats.found,
            added = report.stats.added,
            skipped = report.stats.skipped,
            errors = report.stats.errors,
            "Source scrape completed"
        );

        report
    }

    async fn fetch_query(
        &self,
        source: &dyn JobSource,
        query: &str,
    ) -> Result<Vec<RawListing>, FetchError> {
        let limiter = self.rate_limiter.as_ref();
        let label = format!("{}:{}", source.name(), query);
        self.retry
            .execute(&label, move |_attempt| async move {
                limiter.acquire(source.name()).await;
                source.fetch(query).await
            })
            .await
    }

    fn normalize_all(
        &self,
        source: &dyn JobSource,
        query: &str,
        fetched_at: i64,
        listings: &[RawListing],
        stats: &mut SourceStats,
    ) -> Vec<JobPosting> {
        let ctx = NormalizeContext {
            query,
            fetched_at,
            default_deadline_ms: self.default_deadline_ms,
            ids: self.id_provider.as_ref(),
        };

        listings
            .iter()
            .filter_map(|raw| match source.normalize(raw, &ctx) {
                Ok(posting) => Some(posting),
                Err(e) => {
                    debug!(
                        source = %source.name(),
                        position = raw.position,
                        error = %e,
                        "Skipping malformed listing"
                    );
                    stats.skipped += 1;
                    None
                }
            })
            .collect()
    }
}
