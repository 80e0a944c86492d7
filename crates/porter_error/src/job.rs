//! Errors returned by the outbound job operations.

/// Specific job operation error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum JobErrorKind {
    /// The request was malformed; no job was created
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),

    /// No job with this identifier exists
    #[display("Job not found: {}", _0)]
    NotFound(String),

    /// The store refused a transition that the state machine does not allow
    #[display("Illegal transition for job {}: {} -> {}", job_id, from, to)]
    IllegalTransition {
        /// Job identifier
        job_id: String,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },
}

/// Job error with location tracking.
///
/// # Examples
///
/// ```
/// use porter_error::{JobError, JobErrorKind};
///
/// let err = JobError::new(JobErrorKind::NotFound("42".to_string()));
/// assert!(matches!(err.kind(), JobErrorKind::NotFound(_)));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Job Error: {} at line {} in {}", kind, line, file)]
pub struct JobError {
    kind: JobErrorKind,
    line: u32,
    file: &'static str,
}

impl JobError {
    /// Create a new job error with caller location tracking.
    #[track_caller]
    pub fn new(kind: JobErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an invalid request.
    #[track_caller]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(JobErrorKind::InvalidRequest(reason.into()))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &JobErrorKind {
        &self.kind
    }
}
