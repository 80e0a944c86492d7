//! Platform API error types and retry classification.

use chrono::{DateTime, Utc};
use std::fmt;

/// Error conditions reported by a single external platform call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The platform refused the call because the quota window is exhausted.
    RateLimited {
        /// When the platform says the window resets, if it said so.
        reset_at: Option<DateTime<Utc>>,
    },
    /// Connection, DNS or timeout failure before a response arrived.
    Network(String),
    /// The platform answered with a 5xx status.
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// The target branch or change request already exists.
    Conflict(String),
    /// The platform refused the call for a reason retrying will not fix.
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// The response could not be decoded.
    Decode(String),
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::RateLimited {
                reset_at: Some(reset_at),
            } => write!(f, "Rate limit exceeded, resets at {}", reset_at.to_rfc3339()),
            ApiErrorKind::RateLimited { reset_at: None } => {
                write!(f, "Rate limit exceeded, reset time unknown")
            }
            ApiErrorKind::Network(msg) => write!(f, "Network error: {}", msg),
            ApiErrorKind::Server { status, message } => {
                write!(f, "Server error {}: {}", status, message)
            }
            ApiErrorKind::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiErrorKind::Rejected { status, message } => {
                write!(f, "Rejected with {}: {}", status, message)
            }
            ApiErrorKind::Decode(msg) => write!(f, "Failed to decode response: {}", msg),
        }
    }
}

impl ApiErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiErrorKind::RateLimited { .. } | ApiErrorKind::Network(_) | ApiErrorKind::Server { .. }
        )
    }

    /// Check if this error is a quota signal rather than a transport problem.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ApiErrorKind::RateLimited { .. })
    }
}

/// Quota headers that came back with a failed call.
///
/// A refusal still reports the window it was refused in; the rate-limited
/// client feeds these values to the quota tracker before deciding how long
/// to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportedQuota {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

/// Platform API error with source location tracking.
///
/// # Examples
///
/// ```
/// use porter_error::{ApiError, ApiErrorKind, RetryableError};
///
/// let err = ApiError::new(ApiErrorKind::Server {
///     status: 502,
///     message: "Bad gateway".to_string(),
/// });
/// assert!(err.is_retryable());
/// assert!(format!("{}", err).contains("502"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("API Error: {} at line {} in {}", kind, line, file)]
pub struct ApiError {
    /// The kind of error that occurred
    pub kind: ApiErrorKind,
    /// Quota reported by the failed response, if its headers carried one
    pub quota: Option<ReportedQuota>,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ApiError {
    /// Create a new ApiError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ApiErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            quota: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a transport failure.
    #[track_caller]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network(message.into()))
    }

    /// Shorthand for a quota refusal.
    #[track_caller]
    pub fn rate_limited(reset_at: Option<DateTime<Utc>>) -> Self {
        Self::new(ApiErrorKind::RateLimited { reset_at })
    }

    /// Attach the quota reported alongside the failure.
    pub fn with_quota(mut self, quota: ReportedQuota) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    /// Quota reported alongside the failure.
    pub fn quota(&self) -> Option<ReportedQuota> {
        self.quota
    }
}

/// Trait for errors that support retry logic.
///
/// The rate-limited client asks two questions of every failure: should it be
/// retried at all, and does it carry a quota reset time that tells us exactly
/// how long to wait.
///
/// # Examples
///
/// ```
/// use porter_error::{ApiError, ApiErrorKind, RetryableError};
///
/// let err = ApiError::new(ApiErrorKind::Rejected {
///     status: 404,
///     message: "Not Found".to_string(),
/// });
/// assert!(!err.is_retryable());
/// assert!(err.reset_at().is_none());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Returns true if the failure is a quota refusal.
    fn is_quota_exceeded(&self) -> bool {
        false
    }

    /// Reset time embedded in a quota refusal, if known.
    fn reset_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl RetryableError for ApiError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn is_quota_exceeded(&self) -> bool {
        self.kind.is_quota_exceeded()
    }

    fn reset_at(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            ApiErrorKind::RateLimited { reset_at } => *reset_at,
            _ => None,
        }
    }
}
