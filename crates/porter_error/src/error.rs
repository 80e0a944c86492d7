//! Top-level error wrapper types.

use crate::{ApiError, ConfigError, JobError, MigrationError};

/// This is the foundation error enum. Each Porter crate contributes the
/// errors of its own concern through one of these variants.
///
/// # Examples
///
/// ```
/// use porter_error::{ApiError, PorterError};
///
/// let api_err = ApiError::network("connection reset");
/// let err: PorterError = api_err.into();
/// assert!(format!("{}", err).contains("API Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum PorterErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Platform API error
    #[from(ApiError)]
    Api(ApiError),
    /// Classified migration failure
    #[from(MigrationError)]
    Migration(MigrationError),
    /// Job operation error
    #[from(JobError)]
    Job(JobError),
}

/// Porter error with kind discrimination.
///
/// # Examples
///
/// ```
/// use porter_error::{ConfigError, PorterResult};
///
/// fn might_fail() -> PorterResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Porter Error: {}", _0)]
pub struct PorterError(Box<PorterErrorKind>);

impl PorterError {
    /// Create a new error from a kind.
    pub fn new(kind: PorterErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PorterErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to PorterErrorKind
impl<T> From<T> for PorterError
where
    T: Into<PorterErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Porter operations.
pub type PorterResult<T> = std::result::Result<T, PorterError>;
