//! Collaborator traits.

use crate::{
    AccessToken, BranchRef, ChangeRequest, ChangeRequestDraft, CommitRef, Notice,
    RepositoryMetadata,
};
use async_trait::async_trait;
use porter_core::{CredentialRef, Directive, Observed, RepositoryRef, TransformOutput};
use porter_error::{ApiError, MigrationError};
use std::path::Path;

/// Source-control platform API (GitHub, GitLab).
///
/// Every method returns its payload together with the quota the response
/// reported, so the rate-limited client can keep the tracker current. The
/// orchestrator only ever calls these through that client.
#[async_trait]
pub trait VcsPlatform: Send + Sync {
    /// Read repository metadata.
    async fn get_repository(
        &self,
        repository: &RepositoryRef,
        token: &AccessToken,
    ) -> Result<Observed<RepositoryMetadata>, ApiError>;

    /// Read the text of `path` at `git_ref`.
    ///
    /// A file that does not exist is `Ok` with no content.
    async fn get_file(
        &self,
        repository: &RepositoryRef,
        path: &str,
        git_ref: &str,
        token: &AccessToken,
    ) -> Result<Observed<Option<String>>, ApiError>;

    /// Create `branch` pointing at `from_sha`.
    ///
    /// An existing branch of the same name is a `Conflict`.
    async fn create_branch(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        from_sha: &str,
        token: &AccessToken,
    ) -> Result<Observed<BranchRef>, ApiError>;

    /// Commit everything in `checkout` and push it to `branch`.
    async fn push_commit(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        checkout: &Path,
        message: &str,
        token: &AccessToken,
    ) -> Result<Observed<CommitRef>, ApiError>;

    /// Open a pull request or merge request.
    ///
    /// An open change request for the same head branch is a `Conflict`.
    async fn open_change_request(
        &self,
        repository: &RepositoryRef,
        draft: &ChangeRequestDraft,
        token: &AccessToken,
    ) -> Result<Observed<ChangeRequest>, ApiError>;

    /// Platform name for logs.
    fn name(&self) -> &'static str;
}

/// Git client that produces a local checkout.
#[async_trait]
pub trait RepositoryCloner: Send + Sync {
    /// Clone `repository` at `branch` into `destination`, returning the
    /// checked-out head.
    async fn clone_repository(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        destination: &Path,
        token: &AccessToken,
    ) -> Result<CommitRef, ApiError>;
}

/// Black-box code transformation engine.
#[async_trait]
pub trait TransformationEngine: Send + Sync {
    /// Apply `directives` to the checkout in place.
    ///
    /// # Errors
    ///
    /// A `TransformationFailure` with the engine's diagnostics attached when
    /// the directives cannot be applied.
    async fn transform(
        &self,
        checkout: &Path,
        directives: &[Directive],
    ) -> Result<TransformOutput, MigrationError>;
}

/// Delivers job outcome notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notice.
    async fn notify(&self, notice: &Notice) -> Result<(), MigrationError>;
}

/// Resolves credential references to tokens.
pub trait CredentialStore: Send + Sync {
    /// The token behind `credential`, if it can be resolved.
    fn resolve(&self, credential: &CredentialRef) -> Option<AccessToken>;
}
