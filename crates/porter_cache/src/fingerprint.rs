//! Canonical request fingerprints.

use porter_core::RepositoryRef;
use serde::{Deserialize, Serialize};

/// Canonical cache key of an idempotent request, `operation:subject`.
///
/// Two requests with the same fingerprint must return the same payload while
/// the entry is fresh.
///
/// # Examples
///
/// ```
/// use porter_cache::Fingerprint;
/// use porter_core::RepositoryRef;
///
/// let repo = RepositoryRef::parse("Org/Repo", None).unwrap();
/// let key = Fingerprint::for_repository("analysis", &repo);
/// assert_eq!(key.as_str(), "analysis:github.com/org/repo");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an operation on an arbitrary subject.
    pub fn new(operation: &str, subject: &str) -> Self {
        Self(format!(
            "{}:{}",
            operation.trim().to_ascii_lowercase(),
            subject.trim()
        ))
    }

    /// Fingerprint an operation on a repository.
    pub fn for_repository(operation: &str, repository: &RepositoryRef) -> Self {
        Self::new(operation, &repository.canonical())
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
