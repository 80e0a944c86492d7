//! Migration job record and lifecycle.

use crate::{MigrationRequest, RepositoryRef};
use chrono::{DateTime, Utc};
use porter_error::{FailureKind, JobError, JobErrorKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable job identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for JobId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| JobError::new(JobErrorKind::NotFound(s.to_string())))
    }
}

/// Lifecycle state of a migration job.
///
/// `Completed` and `Failed` are terminal. Every non-terminal state may move to
/// its successor or to `Failed`, and nowhere else.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum JobState {
    /// Created, not yet started
    Pending,
    /// Reading repository metadata
    Analyzing,
    /// Cloning into the job workspace
    Cloning,
    /// Running the transformation engine
    Transforming,
    /// Writing the change summary
    Reporting,
    /// Pushing the branch and opening the change request
    Publishing,
    /// Telling the requester
    Notifying,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
}

impl JobState {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// The state reached when this state's action succeeds.
    pub fn next(&self) -> Option<JobState> {
        match self {
            JobState::Pending => Some(JobState::Analyzing),
            JobState::Analyzing => Some(JobState::Cloning),
            JobState::Cloning => Some(JobState::Transforming),
            JobState::Transforming => Some(JobState::Reporting),
            JobState::Reporting => Some(JobState::Publishing),
            JobState::Publishing => Some(JobState::Notifying),
            JobState::Notifying => Some(JobState::Completed),
            JobState::Completed | JobState::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use porter_core::JobState;
    ///
    /// assert!(JobState::Cloning.can_transition_to(JobState::Transforming));
    /// assert!(JobState::Cloning.can_transition_to(JobState::Failed));
    /// assert!(!JobState::Cloning.can_transition_to(JobState::Publishing));
    /// assert!(!JobState::Completed.can_transition_to(JobState::Failed));
    /// ```
    pub fn can_transition_to(&self, to: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == JobState::Failed || self.next() == Some(to)
    }
}

/// One entry of a job's append-only progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// State entered
    pub state: JobState,
    /// When it was entered
    pub at: DateTime<Utc>,
    /// Optional detail
    #[serde(default)]
    pub detail: Option<String>,
}

/// Links and summary of a successful migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    /// URL of the opened change request
    pub change_request_url: String,
    /// Branch the change was pushed to
    pub branch: String,
    /// Location of the written migration report, if one was written
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    /// One-line change summary
    pub summary: String,
}

/// Classified failure of a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Taxonomy kind
    pub kind: FailureKind,
    /// Human readable detail
    pub message: String,
    /// State the job was in when it failed
    pub failed_state: JobState,
    /// Engine diagnostics, if any
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Change request that was already opened before the failure
    #[serde(default)]
    pub change_request_url: Option<String>,
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobResult {
    /// Migration published
    Completed(CompletionReport),
    /// Migration failed
    Failed(FailureReport),
}

/// A migration job as owned by the job store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Job {
    /// Identifier
    #[getter(skip)]
    id: JobId,
    /// Current state
    #[getter(skip)]
    state: JobState,
    /// Request the job was started with
    request: MigrationRequest,
    /// Repository resolved from the request
    repository: RepositoryRef,
    /// Append-only transition log
    progress: Vec<ProgressEntry>,
    /// Terminal outcome
    result: Option<JobResult>,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Last transition time
    updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a `Pending` job.
    pub fn new(
        id: JobId,
        request: MigrationRequest,
        repository: RepositoryRef,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            state: JobState::Pending,
            request,
            repository,
            progress: vec![ProgressEntry {
                state: JobState::Pending,
                at,
                detail: None,
            }],
            result: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// Job identifier.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Whether the job has finished.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Change request URL, whether the job completed or failed after
    /// publishing.
    pub fn change_request_url(&self) -> Option<&str> {
        match &self.result {
            Some(JobResult::Completed(report)) => Some(&report.change_request_url),
            Some(JobResult::Failed(report)) => report.change_request_url.as_deref(),
            None => None,
        }
    }

    /// Move to `to`, appending a progress entry in the same step.
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` if the state machine does not allow it.
    pub fn transition(
        &mut self,
        to: JobState,
        at: DateTime<Utc>,
        detail: Option<String>,
    ) -> Result<(), JobError> {
        if !self.state.can_transition_to(to) {
            return Err(JobError::new(JobErrorKind::IllegalTransition {
                job_id: self.id.to_string(),
                from: self.state.to_string(),
                to: to.to_string(),
            }));
        }
        self.state = to;
        self.updated_at = at;
        self.progress.push(ProgressEntry {
            state: to,
            at,
            detail,
        });
        Ok(())
    }

    /// Move to `Completed` and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` unless the job is in `Notifying`.
    pub fn complete(&mut self, report: CompletionReport, at: DateTime<Utc>) -> Result<(), JobError> {
        let detail = Some(report.change_request_url.clone());
        self.transition(JobState::Completed, at, detail)?;
        self.result = Some(JobResult::Completed(report));
        Ok(())
    }

    /// Move to `Failed` and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` if the job is already terminal.
    pub fn fail(&mut self, report: FailureReport, at: DateTime<Utc>) -> Result<(), JobError> {
        let detail = Some(format!("{}: {}", report.kind, report.message));
        self.transition(JobState::Failed, at, detail)?;
        self.result = Some(JobResult::Failed(report));
        Ok(())
    }
}
