// Listing normalization: RawListing -> canonical JobPosting

use crate::domain::{EmploymentType, JobPosting, RawListing};
use crate::port::{ListingError, NormalizeContext};

/// Map a raw listing into the canonical record
///
/// `title` and `company` are required. The `sourceId` is `{source}-{upstream id}`
/// when the listing exposes an id (or, failing that, its URL); otherwise it is
/// built from the query, fetch time and page position, which is unique within a
/// run and leaves cross-run dedup to the (title, company, source) fallback.
pub fn normalize_listing(
    raw: &RawListing,
    source: &str,
    default_employment_type: Option<EmploymentType>,
    category: Option<&str>,
    ctx: &NormalizeContext<'_>,
) -> Result<JobPosting, ListingError> {
    let title = required(raw, "title")?;
    let company = required(raw, "company")?;

    let mut posting = JobPosting::new(
        ctx.ids.generate_id(),
        ctx.fetched_at,
        title,
        company,
        source,
    );

    posting.location = clean(raw.text("location"));
    posting.salary = clean(raw.text("salary"));
    posting.experience = clean(raw.text("experience"));
    posting.description = clean(raw.text("description"));
    posting.required_skills = raw.list("skills");
    posting.qualifications = raw.list("qualifications");
    posting.category = clean(raw.text("category")).or_else(|| category.map(str::to_string));
    posting.source_url = clean(raw.text("url"));
    posting.apply_link = clean(raw.text("apply_link")).or_else(|| posting.source_url.clone());
    posting.employment_type = raw
        .text("employment_type")
        .and_then(|t| EmploymentType::from_text(&t))
        .or(default_employment_type)
        .unwrap_or(EmploymentType::FullTime);
    posting.is_auto_posted = true;

    // posted_date and created_at are the fetch time; upstream publication
    // dates never reach the record
    posting.application_deadline = match raw.text("deadline") {
        Some(deadline) => Some(parse_timestamp(&deadline).ok_or_else(|| {
            ListingError::InvalidField {
                field: "deadline",
                reason: format!("unrecognised date '{}'", deadline),
            }
        })?),
        None => Some(ctx.fetched_at.saturating_add(ctx.default_deadline_ms)),
    };

    posting.source_id = Some(source_id(raw, source, ctx));

    Ok(posting)
}

fn required(raw: &RawListing, field: &'static str) -> Result<String, ListingError> {
    clean(raw.text(field)).ok_or(ListingError::MissingField(field))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

fn source_id(raw: &RawListing, source: &str, ctx: &NormalizeContext<'_>) -> String {
    match clean(raw.text("id")).or_else(|| clean(raw.text("url"))) {
        Some(upstream) => format!("{}-{}", source, upstream),
        None => format!(
            "{}-{}-{}-{}",
            source,
            slug(ctx.query),
            ctx.fetched_at,
            raw.position
        ),
    }
}

fn slug(s: &str) -> String {
    let slug: String = s
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Accepts epoch seconds/millis, RFC 3339, zone-less ISO datetimes (UTC) and
/// plain `YYYY-MM-DD` dates. Values chrono cannot represent are rejected.
fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    let millis = if let Ok(n) = s.parse::<i64>() {
        // Anything below ~2286 in seconds is treated as seconds
        if n.checked_abs()? < 10_000_000_000 {
            n * 1000
        } else {
            n
        }
    } else if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        dt.timestamp_millis()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.and_utc().timestamp_millis()
    } else {
        let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis()
    };
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PostingStatus, MS_PER_DAY};
    use crate::port::id_provider::mocks::SequentialIdProvider;

    fn ctx(ids: &SequentialIdProvider) -> NormalizeContext<'_> {
        NormalizeContext {
            query: "Rust Developer",
            fetched_at: 1_700_000_000_000,
            default_deadline_ms: 30 * MS_PER_DAY,
            ids,
        }
    }

    #[test]
    fn test_maps_canonical_fields() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(0)
            .with_text("id", "42")
            .with_text("title", "  Backend   Intern ")
            .with_text("company", "Acme")
            .with_text("location", "Remote")
            .with_text("employment_type", "Internship")
            .with_text("skills", "Rust, SQL")
            .with_text("url", "https://jobs.example/42")
            .with_text("deadline", "2023-12-31");

        let posting = normalize_listing(&raw, "board", None, Some("engineering"), &ctx(&ids))
            .unwrap();

        assert_eq!(posting.id, "posting-1");
        assert_eq!(posting.title, "Backend Intern");
        assert_eq!(posting.source, "board");
        assert_eq!(posting.source_id.as_deref(), Some("board-42"));
        assert_eq!(posting.employment_type, EmploymentType::Internship);
        assert_eq!(posting.required_skills, vec!["Rust", "SQL"]);
        assert_eq!(posting.category.as_deref(), Some("engineering"));
        assert_eq!(posting.apply_link.as_deref(), Some("https://jobs.example/42"));
        assert_eq!(posting.application_deadline, Some(1_703_980_800_000));
        assert_eq!(posting.status, PostingStatus::Active);
        assert!(posting.is_auto_posted);
    }

    #[test]
    fn test_missing_company_is_rejected() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(0).with_text("title", "Intern");

        let err = normalize_listing(&raw, "board", None, None, &ctx(&ids)).unwrap_err();
        assert_eq!(err, ListingError::MissingField("company"));
    }

    #[test]
    fn test_unparsable_date_is_rejected() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(0)
            .with_text("title", "Intern")
            .with_text("company", "Acme")
            .with_text("deadline", "next tuesday");

        let err = normalize_listing(&raw, "board", None, None, &ctx(&ids)).unwrap_err();
        assert!(matches!(err, ListingError::InvalidField { field: "deadline", .. }));
    }

    #[test]
    fn test_source_id_without_upstream_id_uses_query_time_and_position() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(7)
            .with_text("title", "Intern")
            .with_text("company", "Acme");

        let posting = normalize_listing(&raw, "board", None, None, &ctx(&ids)).unwrap();
        assert_eq!(
            posting.source_id.as_deref(),
            Some("board-rust-developer-1700000000000-7")
        );
    }

    #[test]
    fn test_defaults_deadline_and_employment_type() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(0)
            .with_text("title", "Intern")
            .with_text("company", "Acme");

        let posting = normalize_listing(
            &raw,
            "board",
            Some(EmploymentType::Internship),
            None,
            &ctx(&ids),
        )
        .unwrap();

        assert_eq!(posting.posted_date, 1_700_000_000_000);
        assert_eq!(
            posting.application_deadline,
            Some(1_700_000_000_000 + 30 * MS_PER_DAY)
        );
        assert_eq!(posting.employment_type, EmploymentType::Internship);
    }

    #[test]
    fn test_upstream_publication_date_does_not_age_the_record() {
        let ids = SequentialIdProvider::new();
        let raw = RawListing::new(0)
            .with_text("title", "Intern")
            .with_text("company", "Acme")
            .with_text("posted", "2020-01-01");

        let posting = normalize_listing(&raw, "board", None, None, &ctx(&ids)).unwrap();

        assert_eq!(posting.posted_date, 1_700_000_000_000);
        assert_eq!(posting.created_at, 1_700_000_000_000);
        assert_eq!(
            posting.application_deadline,
            Some(1_700_000_000_000 + 30 * MS_PER_DAY)
        );
    }

    #[test]
    fn test_extreme_epoch_deadlines_are_rejected() {
        let ids = SequentialIdProvider::new();
        for value in ["-9223372036854775808", "9223372036854775000"] {
            let raw = RawListing::new(0)
                .with_text("title", "Intern")
                .with_text("company", "Acme")
                .with_text("deadline", value);

            let err = normalize_listing(&raw, "board", None, None, &ctx(&ids)).unwrap_err();
            assert!(
                matches!(err, ListingError::InvalidField { field: "deadline", .. }),
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("1700000000000"), Some(1_700_000_000_000));
        assert_eq!(
            parse_timestamp("2024-03-10T00:00:00Z"),
            Some(1_710_028_800_000)
        );
        assert_eq!(parse_timestamp("2024-03-10"), Some(1_710_028_800_000));
        assert_eq!(
            parse_timestamp("2024-03-10T00:00:00"),
            Some(1_710_028_800_000)
        );
        assert_eq!(parse_timestamp("soon"), None);
        assert_eq!(parse_timestamp(&i64::MIN.to_string()), None);
        assert_eq!(parse_timestamp(&i64::MAX.to_string()), None);
    }
}
