//! Tests for the in-memory job store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use porter_core::{
    CompletionReport, FailureReport, Job, JobId, JobResult, JobState, MigrationRequestBuilder,
};
use porter_error::{FailureKind, JobErrorKind};
use porter_jobs::{InMemoryJobStore, JobFilter, JobStore};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

fn job_for(repository_url: &str, at: DateTime<Utc>) -> Job {
    let request = MigrationRequestBuilder::default()
        .repository_url(repository_url)
        .credential("GITHUB_TOKEN")
        .target_version(21u32)
        .directives(vec!["java_version_upgrade".to_string()])
        .build()
        .unwrap();
    let repository = request.validate().unwrap();
    Job::new(JobId::new(), request, repository, at)
}

#[tokio::test]
async fn test_insert_and_get() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();

    store.insert(job).await.unwrap();

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.id(), id);
    assert_eq!(stored.state(), JobState::Pending);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_duplicate_insert_rejected() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());

    store.insert(job.clone()).await.unwrap();
    let err = store.insert(job).await.unwrap_err();

    assert!(matches!(err.kind(), JobErrorKind::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let store = InMemoryJobStore::new();
    let err = store.get(JobId::new()).await.unwrap_err();
    assert!(matches!(err.kind(), JobErrorKind::NotFound(_)));

    let err = store
        .transition(JobId::new(), JobState::Cloning, t0(), None)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), JobErrorKind::NotFound(_)));
}

#[tokio::test]
async fn test_claim_wins_once() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();
    store.insert(job).await.unwrap();

    assert!(store.claim(id, t0()).await.unwrap());
    assert!(!store.claim(id, t0()).await.unwrap());

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.state(), JobState::Analyzing);
    assert_eq!(stored.progress().len(), 2);
}

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();
    store.insert(job).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.claim(id, t0()).await }));
    }
    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_illegal_transition_leaves_job_untouched() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();
    store.insert(job).await.unwrap();

    let err = store
        .transition(id, JobState::Publishing, t0(), None)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), JobErrorKind::IllegalTransition { .. }));

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.state(), JobState::Pending);
    assert_eq!(stored.progress().len(), 1);
}

#[tokio::test]
async fn test_complete_records_result() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();
    store.insert(job).await.unwrap();
    store.claim(id, t0()).await.unwrap();

    let mut at = t0();
    for state in [
        JobState::Cloning,
        JobState::Transforming,
        JobState::Reporting,
        JobState::Publishing,
        JobState::Notifying,
    ] {
        at += Duration::seconds(1);
        store.transition(id, state, at, None).await.unwrap();
    }
    let done = store
        .complete(
            id,
            CompletionReport {
                change_request_url: "https://github.com/org/repo/pull/12".into(),
                branch: "porter/java-21".into(),
                report_path: None,
                summary: "2 files modified".into(),
            },
            at + Duration::seconds(1),
        )
        .await
        .unwrap();

    assert_eq!(done.state(), JobState::Completed);
    assert_eq!(
        done.change_request_url(),
        Some("https://github.com/org/repo/pull/12")
    );
    assert_eq!(done.progress().len(), 8);
}

#[tokio::test]
async fn test_fail_after_terminal_is_rejected() {
    let store = InMemoryJobStore::new();
    let job = job_for("org/repo", t0());
    let id = job.id();
    store.insert(job).await.unwrap();

    let report = FailureReport {
        kind: FailureKind::Cancelled,
        message: "job cancelled by caller".into(),
        failed_state: JobState::Pending,
        diagnostics: vec![],
        change_request_url: None,
    };
    let failed = store.fail(id, report.clone(), t0()).await.unwrap();
    assert!(matches!(failed.result(), Some(JobResult::Failed(r)) if r.kind == FailureKind::Cancelled));

    let err = store.fail(id, report, t0()).await.unwrap_err();
    assert!(matches!(err.kind(), JobErrorKind::IllegalTransition { .. }));
}

#[tokio::test]
async fn test_list_filters_and_orders() {
    let store = InMemoryJobStore::new();
    let first = job_for("org/alpha", t0());
    let second = job_for("org/beta", t0() + Duration::minutes(1));
    let third = job_for("https://github.com/Org/Alpha", t0() + Duration::minutes(2));
    let (first_id, second_id, third_id) = (first.id(), second.id(), third.id());

    // Insert out of order; listing sorts by creation time.
    store.insert(third).await.unwrap();
    store.insert(first).await.unwrap();
    store.insert(second).await.unwrap();
    store.claim(second_id, t0()).await.unwrap();

    let all: Vec<_> = store
        .list(&JobFilter::new())
        .await
        .unwrap()
        .iter()
        .map(|j| j.id())
        .collect();
    assert_eq!(all, vec![first_id, second_id, third_id]);

    let pending = store
        .list(&JobFilter::new().with_state(JobState::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    let alpha = store
        .list(&JobFilter::new().with_repository("github.com/org/alpha"))
        .await
        .unwrap();
    assert_eq!(alpha.len(), 2);

    let page = store
        .list(&JobFilter::new().with_offset(1).with_limit(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), second_id);
}
