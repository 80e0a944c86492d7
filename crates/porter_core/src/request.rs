//! Migration requests.

use crate::{Directive, Platform, RepositoryRef, validate_directives};
use porter_error::JobError;
use serde::{Deserialize, Serialize};

/// Name under which a credential is resolved, never the secret itself.
///
/// For the bundled credential store this is the name of an environment
/// variable holding the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Wrap a credential name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The credential name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CredentialRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CredentialRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Request to migrate one repository. Write-once: a job keeps the request it
/// was started with.
///
/// # Examples
///
/// ```
/// use porter_core::MigrationRequestBuilder;
///
/// let request = MigrationRequestBuilder::default()
///     .repository_url("org/repo")
///     .credential("GITHUB_TOKEN")
///     .target_version(17u32)
///     .directives(vec!["java_version_upgrade".to_string()])
///     .build()
///     .unwrap();
/// let repo = request.validate().unwrap();
/// assert_eq!(repo.full_name(), "org/repo");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct MigrationRequest {
    /// Repository reference or URL
    repository_url: String,

    /// Platform hint; inferred from the host when absent
    #[builder(default)]
    #[serde(default)]
    platform: Option<Platform>,

    /// Credential used for platform calls and git pushes
    credential: CredentialRef,

    /// Java version the code currently targets, if known
    #[builder(default)]
    #[serde(default)]
    source_version: Option<u32>,

    /// Java version to migrate to
    target_version: u32,

    /// Directive identifiers handed to the transformation engine
    directives: Vec<String>,

    /// Branch to publish to; derived from the job when absent
    #[builder(default)]
    #[serde(default)]
    branch_name: Option<String>,

    /// Recipient to notify on completion
    #[builder(default)]
    #[serde(default)]
    notify: Option<String>,

    /// Bypass (but still repopulate) the analysis cache
    #[builder(default)]
    #[serde(default)]
    force_refresh: bool,
}

impl MigrationRequestBuilder {
    /// Build the MigrationRequest.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` job error if required fields are missing.
    pub fn build(&self) -> Result<MigrationRequest, JobError> {
        self.build_internal()
            .map_err(|e| JobError::invalid_request(e.to_string()))
    }
}

impl MigrationRequest {
    /// Check the request and resolve its repository.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` job error for a malformed repository
    /// reference, a malformed directive list, a version downgrade, or a
    /// malformed branch name.
    pub fn validate(&self) -> Result<RepositoryRef, JobError> {
        let repository = RepositoryRef::parse(&self.repository_url, self.platform)?;
        validate_directives(&self.directives)?;

        if self.credential.as_str().trim().is_empty() {
            return Err(JobError::invalid_request("credential reference is empty"));
        }
        if let Some(source) = self.source_version
            && source > self.target_version
        {
            return Err(JobError::invalid_request(format!(
                "target version {} is older than source version {}",
                self.target_version, source
            )));
        }
        if let Some(branch) = &self.branch_name
            && !is_valid_branch(branch)
        {
            return Err(JobError::invalid_request(format!(
                "invalid branch name '{}'",
                branch
            )));
        }
        Ok(repository)
    }

    /// Validated directive list.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` job error if the list is malformed.
    pub fn directive_list(&self) -> Result<Vec<Directive>, JobError> {
        validate_directives(&self.directives)
    }
}

fn is_valid_branch(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.ends_with(".lock")
        && !name.contains("..")
        && !name.contains("//")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_names() {
        assert!(is_valid_branch("porter/java-17"));
        assert!(!is_valid_branch("bad..name"));
        assert!(!is_valid_branch("has space"));
        assert!(!is_valid_branch("trailing/"));
        assert!(!is_valid_branch(""));
    }
}
