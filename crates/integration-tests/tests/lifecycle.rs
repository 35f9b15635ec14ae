//! Status transitions and cleanup against the SQLite store

mod common;

use common::{pipeline, seed, stored, NOW};
use jobsync_core::application::SourceRegistry;
use jobsync_core::domain::{PostingStatus, MS_PER_DAY};
use jobsync_core::port::PostingRepository;
use jobsync_infra_sqlite::SqlitePostingRepository;

async fn status(repo: &SqlitePostingRepository, id: &str) -> PostingStatus {
    repo.find_by_id(&id.to_string())
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn test_status_update_marks_expiring_and_closed() {
    let p = pipeline(SourceRegistry::new()).await;
    let mut soon = stored("soon", "board", "board-1", "Soon", NOW - MS_PER_DAY);
    soon.application_deadline = Some(NOW + 3 * MS_PER_DAY);
    let mut past = stored("past", "board", "board-2", "Past", NOW - 40 * MS_PER_DAY);
    past.application_deadline = Some(NOW - MS_PER_DAY);
    let mut later = stored("later", "board", "board-3", "Later", NOW - MS_PER_DAY);
    later.application_deadline = Some(NOW + 20 * MS_PER_DAY);
    seed(&p.repo, &[soon, past, later]).await;

    let outcome = p.scheduler.trigger_status_update().await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(status(&p.repo, "soon").await, PostingStatus::ExpiringSoon);
    assert_eq!(status(&p.repo, "past").await, PostingStatus::Closed);
    assert_eq!(status(&p.repo, "later").await, PostingStatus::Active);
}

#[tokio::test]
async fn test_cleanup_only_hard_deletes_auto_posted() {
    let p = pipeline(SourceRegistry::new()).await;
    let created = NOW - 100 * MS_PER_DAY;

    let mut auto = stored("auto", "board", "board-1", "Intern", created);
    auto.application_deadline = Some(created);
    let mut manual = stored("manual", "board", "board-2", "Intern", created);
    manual.application_deadline = Some(created);
    manual.is_auto_posted = false;
    seed(&p.repo, &[auto, manual]).await;

    let outcome = p.scheduler.trigger_cleanup().await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.message, "Expired 1 postings, deleted 1");
    assert!(p.repo.find_by_id(&"auto".to_string()).await.unwrap().is_none());
    let manual = p
        .repo
        .find_by_id(&"manual".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(manual.status, PostingStatus::Active);
}

#[tokio::test]
async fn test_recently_expired_auto_posting_is_only_soft_deleted() {
    let p = pipeline(SourceRegistry::new()).await;
    let mut recent = stored("recent", "board", "board-1", "Intern", NOW - 20 * MS_PER_DAY);
    recent.application_deadline = Some(NOW - MS_PER_DAY);
    seed(&p.repo, &[recent]).await;

    let outcome = p.scheduler.trigger_cleanup().await;

    assert!(outcome.success);
    let recent = p
        .repo
        .find_by_id(&"recent".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recent.status, PostingStatus::Expired);
    assert_eq!(recent.updated_at, NOW);
}
