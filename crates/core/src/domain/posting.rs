// Job Posting Domain Model

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Posting ID (UUID v4)
pub type PostingId = String;

/// Milliseconds per day (all timestamps are epoch ms)
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Posting lifecycle status
///
/// Advances active -> expiring_soon -> closed, or active/expiring_soon -> expired
/// through cleanup. Only a refresh on re-scrape may reset a record to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Active,
    ExpiringSoon,
    Closed,
    Expired,
    /// Legacy status written by older importers, treated like `Active` by cleanup
    Open,
}

impl PostingStatus {
    pub const ALL: [PostingStatus; 5] = [
        PostingStatus::Active,
        PostingStatus::ExpiringSoon,
        PostingStatus::Closed,
        PostingStatus::Expired,
        PostingStatus::Open,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Active => "active",
            PostingStatus::ExpiringSoon => "expiring_soon",
            PostingStatus::Closed => "closed",
            PostingStatus::Expired => "expired",
            PostingStatus::Open => "open",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: PostingStatus) -> bool {
        use PostingStatus::*;
        match (self, to) {
            (Active, ExpiringSoon) => true,
            (Active | ExpiringSoon, Closed) => true,
            (Active | ExpiringSoon | Open, Expired) => true,
            // refresh-on-rescrape
            (_, Active) => true,
            _ => false,
        }
    }

    /// Every status the lifecycle may move to `to` from
    pub fn predecessors(to: PostingStatus) -> Vec<PostingStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| *from != to && from.can_transition_to(to))
            .collect()
    }
}

impl FromStr for PostingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

impl std::fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Remote,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Internship => "internship",
            EmploymentType::Remote => "remote",
        }
    }

    /// Lenient parse of free text found on listing pages
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if s.is_empty() {
            return None;
        }
        if s.contains("intern") {
            Some(EmploymentType::Internship)
        } else if s.contains("part") {
            Some(EmploymentType::PartTime)
        } else if s.contains("contract") || s.contains("freelance") {
            Some(EmploymentType::Contract)
        } else if s.contains("remote") || s.contains("work from home") {
            Some(EmploymentType::Remote)
        } else if s.contains("full") || s.contains("permanent") {
            Some(EmploymentType::FullTime)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical job record all sources map into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: PostingId,

    // Content
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub qualifications: Vec<String>,
    pub category: Option<String>,

    // Provenance
    pub source: String,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub apply_link: Option<String>,

    // Lifecycle (epoch ms)
    pub posted_date: i64,
    pub application_deadline: Option<i64>,
    pub status: PostingStatus,
    pub is_auto_posted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JobPosting {
    /// Create a new active posting
    ///
    /// `id` and `now` are injected so callers stay deterministic under test.
    pub fn new(
        id: impl Into<String>,
        now: i64,
        title: impl Into<String>,
        company: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: None,
            employment_type: EmploymentType::FullTime,
            salary: None,
            experience: None,
            description: None,
            required_skills: Vec::new(),
            qualifications: Vec::new(),
            category: None,
            source: source.into(),
            source_id: None,
            source_url: None,
            apply_link: None,
            posted_date: now,
            application_deadline: None,
            status: PostingStatus::Active,
            is_auto_posted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Age of the posting relative to `now`
    pub fn age_ms(&self, now: i64) -> i64 {
        now - self.posted_date
    }

    /// Re-seen upstream after going stale: restart its clock
    pub fn refresh(&mut self, now: i64, deadline_extension_ms: i64) {
        self.posted_date = now;
        self.application_deadline = Some(now + deadline_extension_ms);
        self.status = PostingStatus::Active;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in PostingStatus::ALL {
            assert_eq!(status.as_str().parse::<PostingStatus>(), Ok(status));
        }
        assert_eq!(
            "archived".parse::<PostingStatus>(),
            Err(DomainError::UnknownStatus("archived".to_string()))
        );
    }

    #[test]
    fn test_closed_and_expired_are_terminal_for_the_lifecycle() {
        use PostingStatus::*;
        assert_eq!(PostingStatus::predecessors(ExpiringSoon), vec![Active]);
        assert_eq!(PostingStatus::predecessors(Closed), vec![Active, ExpiringSoon]);
        assert_eq!(
            PostingStatus::predecessors(Expired),
            vec![Active, ExpiringSoon, Open]
        );
        assert!(!Closed.can_transition_to(Expired));
        assert!(Closed.can_transition_to(Active));
    }

    #[test]
    fn test_refresh_reactivates_and_extends_deadline() {
        let mut posting = JobPosting::new("p-1", 0, "Intern", "Acme", "board");
        posting.status = PostingStatus::ExpiringSoon;
        posting.application_deadline = Some(MS_PER_DAY);

        posting.refresh(10 * MS_PER_DAY, 30 * MS_PER_DAY);

        assert_eq!(posting.status, PostingStatus::Active);
        assert_eq!(posting.posted_date, 10 * MS_PER_DAY);
        assert_eq!(posting.application_deadline, Some(40 * MS_PER_DAY));
        assert_eq!(posting.created_at, 0);
    }

    #[test]
    fn test_employment_type_from_text() {
        assert_eq!(
            EmploymentType::from_text("Summer Internship"),
            Some(EmploymentType::Internship)
        );
        assert_eq!(
            EmploymentType::from_text("PART_TIME"),
            Some(EmploymentType::PartTime)
        );
        assert_eq!(
            EmploymentType::from_text("Freelance"),
            Some(EmploymentType::Contract)
        );
        assert_eq!(EmploymentType::from_text("  "), None);
        assert_eq!(EmploymentType::from_text("volunteer"), None);
    }
}
