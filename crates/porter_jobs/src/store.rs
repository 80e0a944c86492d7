//! Job store trait.

use crate::JobFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use porter_core::{CompletionReport, FailureReport, Job, JobId, JobState};
use porter_error::JobError;

/// Authoritative store of in-flight and completed jobs.
///
/// Implementations must apply each mutation atomically: the state change and
/// its progress entry become visible together or not at all.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if a job with the same id already exists.
    async fn insert(&self, job: Job) -> Result<(), JobError>;

    /// Snapshot of one job.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    async fn get(&self, id: JobId) -> Result<Job, JobError>;

    /// Move a `Pending` job to `Analyzing`.
    ///
    /// Returns `false` without changing anything if the job is already past
    /// `Pending`, so at most one caller ever wins the claim.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    async fn claim(&self, id: JobId, at: DateTime<Utc>) -> Result<bool, JobError>;

    /// Apply a non-terminal transition.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown, `IllegalTransition` if the state
    /// machine forbids it.
    async fn transition(
        &self,
        id: JobId,
        to: JobState,
        at: DateTime<Utc>,
        detail: Option<String>,
    ) -> Result<Job, JobError>;

    /// Record success.
    ///
    /// # Errors
    ///
    /// `NotFound` or `IllegalTransition`.
    async fn complete(
        &self,
        id: JobId,
        report: CompletionReport,
        at: DateTime<Utc>,
    ) -> Result<Job, JobError>;

    /// Record failure.
    ///
    /// # Errors
    ///
    /// `NotFound` or `IllegalTransition` (the job is already terminal).
    async fn fail(&self, id: JobId, report: FailureReport, at: DateTime<Utc>)
    -> Result<Job, JobError>;

    /// Jobs matching `filter`, oldest first.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError>;
}
