// Posting Repository Port (Interface)

use crate::domain::{JobPosting, PostingId, PostingStatus};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Predicate for bulk lifecycle operations
///
/// Every set field narrows the match (AND). An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingFilter {
    pub statuses: Option<Vec<PostingStatus>>,
    pub auto_posted: Option<bool>,
    /// `application_deadline < t` (records without a deadline never match)
    pub deadline_before: Option<i64>,
    /// `application_deadline >= t`
    pub deadline_at_or_after: Option<i64>,
    /// `created_at < t`
    pub created_before: Option<i64>,
    /// `created_at >= t`
    pub created_at_or_after: Option<i64>,
}

impl PostingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(mut self, statuses: &[PostingStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn auto_posted(mut self, auto_posted: bool) -> Self {
        self.auto_posted = Some(auto_posted);
        self
    }

    pub fn deadline_before(mut self, t: i64) -> Self {
        self.deadline_before = Some(t);
        self
    }

    pub fn deadline_at_or_after(mut self, t: i64) -> Self {
        self.deadline_at_or_after = Some(t);
        self
    }

    pub fn created_before(mut self, t: i64) -> Self {
        self.created_before = Some(t);
        self
    }

    pub fn created_at_or_after(mut self, t: i64) -> Self {
        self.created_at_or_after = Some(t);
        self
    }

    /// Evaluate the predicate in memory (adapters translate it to their query language)
    pub fn matches(&self, posting: &JobPosting) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&posting.status) {
                return false;
            }
        }
        if let Some(auto_posted) = self.auto_posted {
            if posting.is_auto_posted != auto_posted {
                return false;
            }
        }
        if let Some(t) = self.deadline_before {
            if !posting.application_deadline.is_some_and(|d| d < t) {
                return false;
            }
        }
        if let Some(t) = self.deadline_at_or_after {
            if !posting.application_deadline.is_some_and(|d| d >= t) {
                return false;
            }
        }
        if let Some(t) = self.created_before {
            if posting.created_at >= t {
                return false;
            }
        }
        if let Some(t) = self.created_at_or_after {
            if posting.created_at < t {
                return false;
            }
        }
        true
    }
}

/// Field changes applied by `update_where`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingChanges {
    pub status: Option<PostingStatus>,
    pub updated_at: i64,
}

impl PostingChanges {
    pub fn status(status: PostingStatus, now_millis: i64) -> Self {
        Self {
            status: Some(status),
            updated_at: now_millis,
        }
    }

    pub fn apply(&self, posting: &mut JobPosting) {
        if let Some(status) = self.status {
            posting.status = status;
        }
        posting.updated_at = self.updated_at;
    }
}

/// Result of `count_by_status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts(pub BTreeMap<String, i64>);

impl StatusCounts {
    pub fn get(&self, status: PostingStatus) -> i64 {
        self.0.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }
}

/// Repository interface for JobPosting persistence
#[async_trait]
pub trait PostingRepository: Send + Sync {
    /// Insert a new posting
    async fn insert(&self, posting: &JobPosting) -> Result<()>;

    /// Find posting by ID
    async fn find_by_id(&self, id: &PostingId) -> Result<Option<JobPosting>>;

    /// Find posting by its source-scoped identifier
    async fn find_by_source_id(&self, source: &str, source_id: &str)
        -> Result<Option<JobPosting>>;

    /// Identity fallback when a listing carries no usable source id
    async fn find_by_title_company_source(
        &self,
        title: &str,
        company: &str,
        source: &str,
    ) -> Result<Option<JobPosting>>;

    /// Update all mutable fields of an existing posting
    async fn update(&self, posting: &JobPosting) -> Result<()>;

    /// Count postings per status
    async fn count_by_status(&self) -> Result<StatusCounts>;

    /// Count postings matching a predicate
    async fn count(&self, filter: &PostingFilter) -> Result<i64>;

    /// Apply `changes` to every posting matching `filter`, returning rows changed
    async fn update_where(&self, filter: &PostingFilter, changes: &PostingChanges) -> Result<u64>;

    /// Delete every posting matching `filter`, returning rows removed
    async fn delete_where(&self, filter: &PostingFilter) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory repository with optional failure injection
    #[derive(Default)]
    pub struct InMemoryPostingRepository {
        postings: Mutex<Vec<JobPosting>>,
        failing_titles: Mutex<HashSet<String>>,
        unavailable: Mutex<bool>,
    }

    impl InMemoryPostingRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_postings(postings: Vec<JobPosting>) -> Self {
            Self {
                postings: Mutex::new(postings),
                ..Default::default()
            }
        }

        /// Inserts and updates of postings with this title fail
        pub fn fail_saves_for(&self, title: impl Into<String>) {
            self.failing_titles.lock().unwrap().insert(title.into());
        }

        /// Every operation fails (simulates an unreachable store)
        pub fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.lock().unwrap() = unavailable;
        }

        pub fn all(&self) -> Vec<JobPosting> {
            self.postings.lock().unwrap().clone()
        }

        pub fn len(&self) -> usize {
            self.postings.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn check_available(&self) -> Result<()> {
            if *self.unavailable.lock().unwrap() {
                return Err(AppError::Database("store unavailable".to_string()));
            }
            Ok(())
        }

        fn check_save(&self, posting: &JobPosting) -> Result<()> {
            self.check_available()?;
            if self.failing_titles.lock().unwrap().contains(&posting.title) {
                return Err(AppError::Database(format!(
                    "injected save failure for '{}'",
                    posting.title
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PostingRepository for InMemoryPostingRepository {
        async fn insert(&self, posting: &JobPosting) -> Result<()> {
            self.check_save(posting)?;
            let mut postings = self.postings.lock().unwrap();
            let duplicate_source_id = posting.source_id.is_some()
                && postings
                    .iter()
                    .any(|p| p.source == posting.source && p.source_id == posting.source_id);
            if duplicate_source_id || postings.iter().any(|p| p.id == posting.id) {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: {}",
                    posting.id
                )));
            }
            postings.push(posting.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &PostingId) -> Result<Option<JobPosting>> {
            self.check_available()?;
            let postings = self.postings.lock().unwrap();
            Ok(postings.iter().find(|p| &p.id == id).cloned())
        }

        async fn find_by_source_id(
            &self,
            source: &str,
            source_id: &str,
        ) -> Result<Option<JobPosting>> {
            self.check_available()?;
            let postings = self.postings.lock().unwrap();
            Ok(postings
                .iter()
                .find(|p| p.source == source && p.source_id.as_deref() == Some(source_id))
                .cloned())
        }

        async fn find_by_title_company_source(
            &self,
            title: &str,
            company: &str,
            source: &str,
        ) -> Result<Option<JobPosting>> {
            self.check_available()?;
            let postings = self.postings.lock().unwrap();
            Ok(postings
                .iter()
                .find(|p| p.title == title && p.company == company && p.source == source)
                .cloned())
        }

        async fn update(&self, posting: &JobPosting) -> Result<()> {
            self.check_save(posting)?;
            let mut postings = self.postings.lock().unwrap();
            match postings.iter_mut().find(|p| p.id == posting.id) {
                Some(existing) => {
                    *existing = posting.clone();
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("Posting {} not found", posting.id))),
            }
        }

        async fn count_by_status(&self) -> Result<StatusCounts> {
            self.check_available()?;
            let postings = self.postings.lock().unwrap();
            let mut counts = BTreeMap::new();
            for posting in postings.iter() {
                *counts.entry(posting.status.as_str().to_string()).or_insert(0) += 1;
            }
            Ok(StatusCounts(counts))
        }

        async fn count(&self, filter: &PostingFilter) -> Result<i64> {
            self.check_available()?;
            let postings = self.postings.lock().unwrap();
            Ok(postings.iter().filter(|p| filter.matches(p)).count() as i64)
        }

        async fn update_where(
            &self,
            filter: &PostingFilter,
            changes: &PostingChanges,
        ) -> Result<u64> {
            self.check_available()?;
            let mut postings = self.postings.lock().unwrap();
            let mut changed = 0;
            for posting in postings.iter_mut().filter(|p| filter.matches(p)) {
                changes.apply(posting);
                changed += 1;
            }
            Ok(changed)
        }

        async fn delete_where(&self, filter: &PostingFilter) -> Result<u64> {
            self.check_available()?;
            let mut postings = self.postings.lock().unwrap();
            let before = postings.len();
            postings.retain(|p| !filter.matches(p));
            Ok((before - postings.len()) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MS_PER_DAY;

    fn posting(deadline: Option<i64>, created_at: i64, auto: bool) -> JobPosting {
        let mut p = JobPosting::new("p", created_at, "Intern", "Acme", "board");
        p.application_deadline = deadline;
        p.is_auto_posted = auto;
        p
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(PostingFilter::new().matches(&posting(None, 0, false)));
    }

    #[test]
    fn test_deadline_bounds_skip_missing_deadline() {
        let filter = PostingFilter::new().deadline_before(10 * MS_PER_DAY);
        assert!(!filter.matches(&posting(None, 0, true)));
        assert!(filter.matches(&posting(Some(MS_PER_DAY), 0, true)));
        assert!(!filter.matches(&posting(Some(10 * MS_PER_DAY), 0, true)));

        let window = PostingFilter::new()
            .deadline_at_or_after(MS_PER_DAY)
            .deadline_before(2 * MS_PER_DAY);
        assert!(window.matches(&posting(Some(MS_PER_DAY), 0, true)));
        assert!(!window.matches(&posting(Some(2 * MS_PER_DAY), 0, true)));
    }

    #[test]
    fn test_filter_combines_with_and() {
        let filter = PostingFilter::new()
            .auto_posted(true)
            .created_before(100)
            .statuses(&[PostingStatus::Active]);

        assert!(filter.matches(&posting(None, 50, true)));
        assert!(!filter.matches(&posting(None, 50, false)));
        assert!(!filter.matches(&posting(None, 150, true)));
    }
}
