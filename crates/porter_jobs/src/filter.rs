//! Job listing filters.

use porter_core::{Job, JobState};
use serde::{Deserialize, Serialize};

/// Filter criteria for listing jobs.
///
/// All fields are optional. Combining multiple criteria creates an AND
/// condition. Results are ordered oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    /// Filter by current state
    pub state: Option<JobState>,
    /// Filter by canonical repository (`host/owner/name`, case-insensitive)
    pub repository: Option<String>,
    /// Maximum number of results to return
    pub limit: Option<usize>,
    /// Number of results to skip (for pagination)
    pub offset: Option<usize>,
}

impl JobFilter {
    /// Create an empty filter (returns all jobs).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by state.
    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    /// Filter by repository.
    pub fn with_repository<S: Into<String>>(mut self, repository: S) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Set pagination limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether `job` passes the state and repository criteria.
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(state) = self.state
            && job.state() != state
        {
            return false;
        }
        if let Some(ref repository) = self.repository
            && job.repository().canonical() != repository.to_ascii_lowercase()
        {
            return false;
        }
        true
    }
}
