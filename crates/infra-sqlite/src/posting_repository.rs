// SQLite PostingRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jobsync_core::domain::{EmploymentType, JobPosting, PostingId, PostingStatus};
use jobsync_core::error::{AppError, Result};
use jobsync_core::port::{PostingChanges, PostingFilter, PostingRepository, StatusCounts};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

pub struct SqlitePostingRepository {
    pool: SqlitePool,
}

impl SqlitePostingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Append `filter` as a WHERE clause
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PostingFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            qb.push(" AND 0 = 1");
        } else {
            qb.push(" AND status IN (");
            let mut separated = qb.separated(", ");
            for status in statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
    }
    if let Some(auto_posted) = filter.auto_posted {
        qb.push(" AND is_auto_posted = ").push_bind(auto_posted);
    }
    // NULL deadlines never compare true, matching the in-memory predicate
    if let Some(t) = filter.deadline_before {
        qb.push(" AND application_deadline < ").push_bind(t);
    }
    if let Some(t) = filter.deadline_at_or_after {
        qb.push(" AND application_deadline >= ").push_bind(t);
    }
    if let Some(t) = filter.created_before {
        qb.push(" AND created_at < ").push_bind(t);
    }
    if let Some(t) = filter.created_at_or_after {
        qb.push(" AND created_at >= ").push_bind(t);
    }
}

#[async_trait]
impl PostingRepository for SqlitePostingRepository {
    async fn insert(&self, posting: &JobPosting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_postings (
                id, title, company, location, employment_type,
                salary, experience, description, required_skills, qualifications,
                category, source, source_id, source_url, apply_link,
                posted_date, application_deadline, status, is_auto_posted,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&posting.id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(posting.employment_type.as_str())
        .bind(&posting.salary)
        .bind(&posting.experience)
        .bind(&posting.description)
        .bind(serde_json::to_string(&posting.required_skills)?)
        .bind(serde_json::to_string(&posting.qualifications)?)
        .bind(&posting.category)
        .bind(&posting.source)
        .bind(&posting.source_id)
        .bind(&posting.source_url)
        .bind(&posting.apply_link)
        .bind(posting.posted_date)
        .bind(posting.application_deadline)
        .bind(posting.status.as_str())
        .bind(posting.is_auto_posted)
        .bind(posting.created_at)
        .bind(posting.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PostingId) -> Result<Option<JobPosting>> {
        let row = sqlx::query_as::<_, PostingRow>("SELECT * FROM job_postings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostingRow::into_posting).transpose()
    }

    async fn find_by_source_id(
        &self,
        source: &str,
        source_id: &str,
    ) -> Result<Option<JobPosting>> {
        let row = sqlx::query_as::<_, PostingRow>(
            "SELECT * FROM job_postings WHERE source = ? AND source_id = ?",
        )
        .bind(source)
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostingRow::into_posting).transpose()
    }

    async fn find_by_title_company_source(
        &self,
        title: &str,
        company: &str,
        source: &str,
    ) -> Result<Option<JobPosting>> {
        let row = sqlx::query_as::<_, PostingRow>(
            r#"
            SELECT * FROM job_postings
            WHERE source = ? AND title = ? AND company = ?
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(source)
        .bind(title)
        .bind(company)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostingRow::into_posting).transpose()
    }

    async fn update(&self, posting: &JobPosting) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE job_postings
            SET title = ?, company = ?, location = ?, employment_type = ?,
                salary = ?, experience = ?, description = ?,
                required_skills = ?, qualifications = ?, category = ?,
                source_url = ?, apply_link = ?,
                posted_date = ?, application_deadline = ?, status = ?,
                is_auto_posted = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(posting.employment_type.as_str())
        .bind(&posting.salary)
        .bind(&posting.experience)
        .bind(&posting.description)
        .bind(serde_json::to_string(&posting.required_skills)?)
        .bind(serde_json::to_string(&posting.qualifications)?)
        .bind(&posting.category)
        .bind(&posting.source_url)
        .bind(&posting.apply_link)
        .bind(posting.posted_date)
        .bind(posting.application_deadline)
        .bind(posting.status.as_str())
        .bind(posting.is_auto_posted)
        .bind(posting.updated_at)
        .bind(&posting.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Posting {} not found",
                posting.id
            )));
        }
        Ok(())
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM job_postings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(StatusCounts(rows.into_iter().collect::<BTreeMap<_, _>>()))
    }

    async fn count(&self, filter: &PostingFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM job_postings");
        push_filter(&mut qb, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update_where(&self, filter: &PostingFilter, changes: &PostingChanges) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE job_postings SET updated_at = ");
        qb.push_bind(changes.updated_at);
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        push_filter(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_where(&self, filter: &PostingFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM job_postings");
        push_filter(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct PostingRow {
    id: String,
    title: String,
    company: String,
    location: Option<String>,
    employment_type: String,
    salary: Option<String>,
    experience: Option<String>,
    description: Option<String>,
    required_skills: String, // JSON array
    qualifications: String,  // JSON array
    category: Option<String>,
    source: String,
    source_id: Option<String>,
    source_url: Option<String>,
    apply_link: Option<String>,
    posted_date: i64,
    application_deadline: Option<i64>,
    status: String,
    is_auto_posted: bool,
    created_at: i64,
    updated_at: i64,
}

impl PostingRow {
    fn into_posting(self) -> Result<JobPosting> {
        let status: PostingStatus = self.status.parse()?;
        let employment_type =
            EmploymentType::from_text(&self.employment_type).unwrap_or(EmploymentType::FullTime);

        Ok(JobPosting {
            id: self.id,
            title: self.title,
            company: self.company,
            location: self.location,
            employment_type,
            salary: self.salary,
            experience: self.experience,
            description: self.description,
            required_skills: serde_json::from_str(&self.required_skills).unwrap_or_default(),
            qualifications: serde_json::from_str(&self.qualifications).unwrap_or_default(),
            category: self.category,
            source: self.source,
            source_id: self.source_id,
            source_url: self.source_url,
            apply_link: self.apply_link,
            posted_date: self.posted_date,
            application_deadline: self.application_deadline,
            status,
            is_auto_posted: self.is_auto_posted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use jobsync_core::domain::MS_PER_DAY;
    use tokio_test::{assert_err, assert_ok};

    const NOW: i64 = 1_700_000_000_000;

    async fn setup_repo() -> SqlitePostingRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqlitePostingRepository::new(pool)
    }

    fn posting(id: &str, source_id: Option<&str>, title: &str) -> JobPosting {
        let mut p = JobPosting::new(id, NOW, title, "Acme", "board");
        p.source_id = source_id.map(str::to_string);
        p.employment_type = EmploymentType::Internship;
        p.required_skills = vec!["Rust".to_string(), "SQL".to_string()];
        p.application_deadline = Some(NOW + 30 * MS_PER_DAY);
        p.is_auto_posted = true;
        p
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let repo = setup_repo().await;
        let p = posting("p1", Some("board-1"), "Backend Intern");
        repo.insert(&p).await.unwrap();

        assert_eq!(repo.find_by_id(&"p1".to_string()).await.unwrap(), Some(p.clone()));
        assert_eq!(
            repo.find_by_source_id("board", "board-1").await.unwrap(),
            Some(p.clone())
        );
        assert_eq!(
            repo.find_by_title_company_source("Backend Intern", "Acme", "board")
                .await
                .unwrap()
                .map(|found| found.id),
            Some("p1".to_string())
        );
        assert!(repo
            .find_by_source_id("other", "board-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_source_id_is_unique_per_source() {
        let repo = setup_repo().await;
        assert_ok!(repo.insert(&posting("p1", Some("board-1"), "A")).await);

        let err = assert_err!(repo.insert(&posting("p2", Some("board-1"), "B")).await);
        assert!(err.to_string().contains("Unique constraint"));

        // Postings without a source id do not collide
        assert_ok!(repo.insert(&posting("p3", None, "C")).await);
        assert_ok!(repo.insert(&posting("p4", None, "D")).await);
    }

    #[tokio::test]
    async fn test_update_missing_posting_is_not_found() {
        let repo = setup_repo().await;
        let err = repo.update(&posting("ghost", None, "A")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_update_and_delete_follow_filter() {
        let repo = setup_repo().await;

        let mut past = posting("past", Some("board-1"), "A");
        past.application_deadline = Some(NOW - MS_PER_DAY);
        past.created_at = NOW - 100 * MS_PER_DAY;
        let mut manual = past.clone();
        manual.id = "manual".to_string();
        manual.source_id = Some("board-2".to_string());
        manual.is_auto_posted = false;
        let mut no_deadline = posting("none", Some("board-3"), "C");
        no_deadline.application_deadline = None;

        for p in [&past, &manual, &no_deadline] {
            repo.insert(p).await.unwrap();
        }

        let expired = repo
            .update_where(
                &PostingFilter::new()
                    .auto_posted(true)
                    .statuses(&[PostingStatus::Active, PostingStatus::Open])
                    .deadline_before(NOW),
                &PostingChanges::status(PostingStatus::Expired, NOW),
            )
            .await
            .unwrap();
        assert_eq!(expired, 1);

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts.get(PostingStatus::Expired), 1);
        assert_eq!(counts.get(PostingStatus::Active), 2);
        assert_eq!(counts.total(), 3);

        let deleted = repo
            .delete_where(
                &PostingFilter::new()
                    .auto_posted(true)
                    .deadline_before(NOW)
                    .created_before(NOW - 90 * MS_PER_DAY),
            )
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.find_by_id(&"past".to_string()).await.unwrap().is_none());
        assert!(repo.find_by_id(&"manual".to_string()).await.unwrap().is_some());
        assert_eq!(repo.count(&PostingFilter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_with_empty_status_list_matches_nothing() {
        let repo = setup_repo().await;
        repo.insert(&posting("p1", Some("board-1"), "A")).await.unwrap();

        let count = repo
            .count(&PostingFilter::new().statuses(&[]))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
