//! The migration orchestrator.

use crate::pipeline::{Collaborators, drive};
use porter_core::{
    CancelToken, Clock, Endpoint, FailureReport, Job, JobId, JobState, MigrationRequest,
    Platform, QuotaState, SystemClock,
};
use porter_error::{FailureKind, JobError};
use porter_interface::{
    CredentialStore, Notifier, RepositoryCloner, TransformationEngine, VcsPlatform,
};
use porter_jobs::{JobFilter, JobStore};
use porter_rate_limit::{OrchestratorSettings, RateLimitedClient};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{Instrument, debug, info, info_span, instrument};

/// Handle on a spawned job task.
struct RunningJob {
    cancel: CancelToken,
    done: watch::Receiver<bool>,
}

/// Accepts migration requests and drives each job to a terminal state.
///
/// Each started job runs on its own tokio task. All jobs share one
/// [`RateLimitedClient`], so quota observed by one job throttles every
/// other job against the same endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = MigrationOrchestrator::new(store, client, cloner, engine, credentials)
///     .with_platform(Platform::GitHub, Arc::new(github));
///
/// let job_id = orchestrator.start_job(request).await?;
/// let job = orchestrator.wait(job_id).await?;
/// println!("{}: {:?}", job.state(), job.change_request_url());
/// ```
pub struct MigrationOrchestrator {
    parts: Collaborators,
    running: Arc<Mutex<HashMap<JobId, RunningJob>>>,
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut platforms: Vec<_> = self.parts.platforms.keys().map(|p| p.to_string()).collect();
        platforms.sort();
        f.debug_struct("MigrationOrchestrator")
            .field("platforms", &platforms)
            .field("settings", &self.parts.settings)
            .field("client", &self.parts.client)
            .finish_non_exhaustive()
    }
}

impl MigrationOrchestrator {
    /// Create an orchestrator with default settings, no platforms, no
    /// notifier and the system clock.
    pub fn new(
        store: Arc<dyn JobStore>,
        client: RateLimitedClient,
        cloner: Arc<dyn RepositoryCloner>,
        engine: Arc<dyn TransformationEngine>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            parts: Collaborators {
                store,
                client,
                platforms: HashMap::new(),
                cloner,
                engine,
                notifier: None,
                credentials,
                settings: OrchestratorSettings::default(),
                clock: Arc::new(SystemClock),
            },
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register the API client for `platform`.
    pub fn with_platform(mut self, platform: Platform, client: Arc<dyn VcsPlatform>) -> Self {
        self.parts.platforms.insert(platform, client);
        self
    }

    /// Deliver completion notices through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.parts.notifier = Some(notifier);
        self
    }

    /// Replace the driver settings.
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.parts.settings = settings;
        self
    }

    /// Timestamp progress with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.parts.clock = clock;
        self
    }

    /// Shared rate-limited client.
    pub fn client(&self) -> &RateLimitedClient {
        &self.parts.client
    }

    /// Driver settings.
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.parts.settings
    }

    /// Validate `request` and record it as a `Pending` job without starting
    /// it.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a malformed repository reference or directive
    /// list, a platform without a registered client, or a credential that
    /// cannot be resolved. No job is created in that case.
    #[instrument(skip(self, request), fields(repository = %request.repository_url()))]
    pub async fn submit(&self, request: MigrationRequest) -> Result<JobId, JobError> {
        let repository = request.validate()?;
        if !self.parts.platforms.contains_key(&repository.platform) {
            return Err(JobError::invalid_request(format!(
                "no {} client configured",
                repository.platform
            )));
        }
        if self.parts.credentials.resolve(request.credential()).is_none() {
            return Err(JobError::invalid_request(format!(
                "credential '{}' cannot be resolved",
                request.credential()
            )));
        }

        let job = Job::new(JobId::new(), request, repository, self.parts.clock.now());
        let id = job.id();
        self.parts.store.insert(job).await?;
        info!(job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Submit `request` and start the job.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` as for [`MigrationOrchestrator::submit`].
    pub async fn start_job(&self, request: MigrationRequest) -> Result<JobId, JobError> {
        let id = self.submit(request).await?;
        self.start(id).await?;
        Ok(id)
    }

    /// Start a `Pending` job on its own task.
    ///
    /// Returns `false` without doing anything when the job is already past
    /// `Pending`, so repeated calls never run a job twice.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn start(&self, id: JobId) -> Result<bool, JobError> {
        let mut running = self.running.lock().await;
        if !self.parts.store.claim(id, self.parts.clock.now()).await? {
            debug!("Start ignored, job already past Pending");
            return Ok(false);
        }
        let job = self.parts.store.get(id).await?;

        let cancel = CancelToken::new();
        let (done_tx, done_rx) = watch::channel(false);
        let parts = self.parts.clone();
        let task_cancel = cancel.clone();
        let tasks = Arc::clone(&self.running);
        tokio::spawn(
            async move {
                drive(parts, job, task_cancel).await;
                done_tx.send_replace(true);
                tasks.lock().await.remove(&id);
                debug!("Job task finished");
            }
            .instrument(info_span!("job", job_id = %id)),
        );
        running.insert(
            id,
            RunningJob {
                cancel,
                done: done_rx,
            },
        );
        info!("Job task spawned");
        Ok(true)
    }

    /// Snapshot of one job.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub async fn get_job_status(&self, id: JobId) -> Result<Job, JobError> {
        self.parts.store.get(id).await
    }

    /// Cancel a job. A terminal job is left untouched.
    ///
    /// A running job has its waits interrupted and fails with `Cancelled`
    /// in its current state. A change request it already opened stays open.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn cancel_job(&self, id: JobId) -> Result<(), JobError> {
        let running = self.running.lock().await;
        let job = self.parts.store.get(id).await?;
        if job.is_terminal() {
            debug!(state = %job.state(), "Cancel ignored, job is terminal");
            return Ok(());
        }
        if let Some(run) = running.get(&id) {
            info!(state = %job.state(), "Cancelling running job");
            run.cancel.cancel();
            return Ok(());
        }

        info!("Cancelling job that never started");
        let report = FailureReport {
            kind: FailureKind::Cancelled,
            message: "job cancelled by caller".to_string(),
            failed_state: job.state(),
            diagnostics: Vec::new(),
            change_request_url: None,
        };
        self.parts
            .store
            .fail(id, report, self.parts.clock.now())
            .await?;
        Ok(())
    }

    /// Block until a started job is terminal, then return it.
    ///
    /// A job that was never started, or whose task has already finished, is
    /// returned as the store has it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub async fn wait(&self, id: JobId) -> Result<Job, JobError> {
        let done = self
            .running
            .lock()
            .await
            .get(&id)
            .map(|run| run.done.clone());
        if let Some(mut done) = done {
            // A closed channel means the task is gone; the store has the outcome.
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.parts.store.get(id).await
    }

    /// Number of job tasks still in flight.
    pub async fn running_jobs(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Jobs matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates job store errors.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        self.parts.store.list(filter).await
    }

    /// Read-only copy of every tracked quota.
    pub async fn get_quota_status(&self) -> BTreeMap<Endpoint, QuotaState> {
        self.parts.client.tracker().snapshot().await
    }

    /// One-line quota summary for logs.
    pub async fn quota_status_line(&self) -> String {
        self.parts.client.tracker().status_line().await
    }

    /// Number of jobs in `state`.
    ///
    /// # Errors
    ///
    /// Propagates job store errors.
    pub async fn count_in_state(&self, state: JobState) -> Result<usize, JobError> {
        Ok(self
            .parts
            .store
            .list(&JobFilter::new().with_state(state))
            .await?
            .len())
    }
}
