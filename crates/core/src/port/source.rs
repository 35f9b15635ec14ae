// Job Source Port
// One implementation per external job board; the Aggregator only sees this trait.

use crate::domain::{EmploymentType, JobPosting, RawListing};
use crate::port::IdProvider;
use async_trait::async_trait;
use thiserror::Error;

/// Retrieval errors (retried by the RetryExecutor)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Unparsable response: {0}")]
    Parse(String),

    #[error("Source misconfigured: {0}")]
    Config(String),
}

/// A single listing rejected during normalization (skipped, never fatal)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Per-fetch context handed to `normalize`
pub struct NormalizeContext<'a> {
    /// Search query the listing was fetched for
    pub query: &'a str,
    /// Fetch time (epoch ms); becomes posted/created time unless the listing has one
    pub fetched_at: i64,
    /// Deadline granted when the listing carries none
    pub default_deadline_ms: i64,
    pub ids: &'a dyn IdProvider,
}

/// Source capability contract: fetch raw listings, normalize them
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Stable source name stored in `JobPosting::source`
    fn name(&self) -> &str;

    /// Sub-units of work (search keywords / pages), fetched with bounded concurrency
    fn queries(&self) -> Vec<String>;

    /// Employment type used when a listing does not state one
    fn default_employment_type(&self) -> Option<EmploymentType> {
        None
    }

    fn category(&self) -> Option<&str> {
        None
    }

    /// Retrieve raw listings for one query
    ///
    /// # Errors
    /// Any `FetchError`; the caller retries and finally records it against this source
    async fn fetch(&self, query: &str) -> Result<Vec<RawListing>, FetchError>;

    /// Map a raw listing into the canonical record
    fn normalize(
        &self,
        raw: &RawListing,
        ctx: &NormalizeContext<'_>,
    ) -> Result<JobPosting, ListingError> {
        crate::application::normalize::normalize_listing(
            raw,
            self.name(),
            self.default_employment_type(),
            self.category(),
            ctx,
        )
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Source that replays scripted fetch outcomes, one per call
    ///
    /// When the script runs out the last outcome repeats.
    pub struct ScriptedSource {
        name: String,
        queries: Vec<String>,
        script: Mutex<VecDeque<Result<Vec<RawListing>, FetchError>>>,
        last: Mutex<Option<Result<Vec<RawListing>, FetchError>>>,
        calls: AtomicUsize,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl ScriptedSource {
        pub fn new(
            name: impl Into<String>,
            script: Vec<Result<Vec<RawListing>, FetchError>>,
        ) -> Self {
            Self {
                name: name.into(),
                queries: vec!["default".to_string()],
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        /// Always returns the same listings
        pub fn returning(name: impl Into<String>, listings: Vec<RawListing>) -> Self {
            Self::new(name, vec![Ok(listings)])
        }

        /// Always fails
        pub fn failing(name: impl Into<String>, error: FetchError) -> Self {
            Self::new(name, vec![Err(error)])
        }

        pub fn with_queries(mut self, queries: &[&str]) -> Self {
            self.queries = queries.iter().map(|q| q.to_string()).collect();
            self
        }

        /// Each fetch signals `entered` and then waits for `release`
        pub fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
            self.gate = Some((entered, release));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn queries(&self) -> Vec<String> {
            self.queries.clone()
        }

        async fn fetch(&self, _query: &str) -> Result<Vec<RawListing>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }

            let next = self.script.lock().unwrap().pop_front();
            let outcome = match next {
                Some(outcome) => {
                    *self.last.lock().unwrap() = Some(outcome.clone());
                    outcome
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Ok(Vec::new())),
            };
            outcome
        }
    }

    /// Listing with the fields every source must provide
    pub fn listing(position: usize, id: &str, title: &str, company: &str) -> RawListing {
        RawListing::new(position)
            .with_text("id", id)
            .with_text("title", title)
            .with_text("company", company)
    }
}
