//! In-memory job store.

use crate::{JobFilter, JobStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use porter_core::{CompletionReport, FailureReport, Job, JobId, JobState};
use porter_error::{JobError, JobErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// In-memory job store.
///
/// Stores jobs in a HashMap protected by an RwLock for thread-safe access.
/// Every mutation happens under the write lock, so readers never see a
/// state without its progress entry. All data is lost when the store is
/// dropped.
///
/// # Example
/// ```no_run
/// use porter_jobs::{InMemoryJobStore, JobFilter, JobStore};
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryJobStore::new();
///     let jobs = store.list(&JobFilter::new()).await.unwrap();
///     assert!(jobs.is_empty());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl InMemoryJobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn mutate<F>(&self, id: JobId, apply: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job) -> Result<(), JobError> + Send,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or_else(|| not_found(id))?;
        // Apply to a copy so a rejected change leaves the stored job untouched.
        let mut updated = job.clone();
        apply(&mut updated)?;
        *job = updated.clone();
        Ok(updated)
    }
}

fn not_found(id: JobId) -> JobError {
    JobError::new(JobErrorKind::NotFound(id.to_string()))
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id()))]
    async fn insert(&self, job: Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id()) {
            return Err(JobError::invalid_request(format!(
                "job {} already exists",
                job.id()
            )));
        }
        debug!("Stored new job");
        jobs.insert(job.id(), job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Job, JobError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn claim(&self, id: JobId, at: DateTime<Utc>) -> Result<bool, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or_else(|| not_found(id))?;
        if job.state() != JobState::Pending {
            debug!(state = %job.state(), "Job already started");
            return Ok(false);
        }
        job.transition(JobState::Analyzing, at, None)?;
        info!("Job claimed");
        Ok(true)
    }

    #[instrument(skip(self, detail), fields(job_id = %id, to = %to))]
    async fn transition(
        &self,
        id: JobId,
        to: JobState,
        at: DateTime<Utc>,
        detail: Option<String>,
    ) -> Result<Job, JobError> {
        self.mutate(id, |job| job.transition(to, at, detail)).await
    }

    #[instrument(skip(self, report), fields(job_id = %id))]
    async fn complete(
        &self,
        id: JobId,
        report: CompletionReport,
        at: DateTime<Utc>,
    ) -> Result<Job, JobError> {
        self.mutate(id, |job| job.complete(report, at)).await
    }

    #[instrument(skip(self, report), fields(job_id = %id, kind = %report.kind))]
    async fn fail(
        &self,
        id: JobId,
        report: FailureReport,
        at: DateTime<Utc>,
    ) -> Result<Job, JobError> {
        self.mutate(id, |job| job.fail(report, at)).await
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        let jobs = self.jobs.read().await;
        let mut results: Vec<Job> = jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            a.created_at()
                .cmp(b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }
}
