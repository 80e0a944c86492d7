//! Job failure taxonomy.

use crate::{ApiError, ApiErrorKind};
use serde::{Deserialize, Serialize};

/// Classified reason a migration job could not complete.
///
/// Every terminal failure recorded on a job carries exactly one of these, so
/// consumers can match exhaustively instead of probing error strings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
pub enum FailureKind {
    /// Malformed input, rejected before a job exists
    #[display("InvalidRequest")]
    InvalidRequest,
    /// Every retry was spent waiting on an exhausted platform quota
    #[display("QuotaExhausted")]
    QuotaExhausted,
    /// Connectivity or timeout failure that outlived its retry budget
    #[display("TransientNetwork")]
    TransientNetwork,
    /// The transformation engine could not apply the requested directives
    #[display("TransformationFailure")]
    TransformationFailure,
    /// The target branch or change request could not be created
    #[display("PublishConflict")]
    PublishConflict,
    /// The platform refused the call permanently (auth, missing repository)
    #[display("PlatformRejected")]
    PlatformRejected,
    /// The job-scoped working directory could not be prepared
    #[display("Workspace")]
    Workspace,
    /// The job was cancelled by its caller
    #[display("Cancelled")]
    Cancelled,
}

impl FailureKind {
    /// Whether the rate-limited client may retry a failure of this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::QuotaExhausted | FailureKind::TransientNetwork)
    }
}

/// Migration failure with taxonomy kind and source location.
///
/// # Examples
///
/// ```
/// use porter_error::{FailureKind, MigrationError};
///
/// let err = MigrationError::new(FailureKind::PublishConflict, "branch already exists")
///     .with_guidance("choose a different branch name");
/// assert_eq!(err.kind, FailureKind::PublishConflict);
/// assert!(err.message.contains("different branch"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Migration Error ({}): {} at line {} in {}", kind, message, line, file)]
pub struct MigrationError {
    /// Taxonomy kind
    pub kind: FailureKind,
    /// Human readable detail
    pub message: String,
    /// Diagnostics attached by the transformation engine, if any
    pub diagnostics: Vec<String>,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl MigrationError {
    /// Create a new MigrationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            diagnostics: Vec::new(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a cancellation.
    #[track_caller]
    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "job cancelled by caller")
    }

    /// Attach engine diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Append operator guidance to the message.
    pub fn with_guidance(mut self, guidance: impl AsRef<str>) -> Self {
        self.message = format!("{} ({})", self.message, guidance.as_ref());
        self
    }

    /// Get the failure kind.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }
}

impl From<ApiError> for MigrationError {
    #[track_caller]
    fn from(err: ApiError) -> Self {
        let kind = match &err.kind {
            ApiErrorKind::RateLimited { .. } => FailureKind::QuotaExhausted,
            ApiErrorKind::Network(_) | ApiErrorKind::Server { .. } => {
                FailureKind::TransientNetwork
            }
            ApiErrorKind::Conflict(_) => FailureKind::PublishConflict,
            ApiErrorKind::Rejected { .. } | ApiErrorKind::Decode(_) => {
                FailureKind::PlatformRejected
            }
        };
        let message = err.kind.to_string();
        let migration = MigrationError::new(kind, message);
        if kind == FailureKind::PublishConflict {
            migration.with_guidance("choose a different target branch")
        } else {
            migration
        }
    }
}
