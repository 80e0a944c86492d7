//! GitLab REST client.

use crate::GitCli;
use crate::http::{USER_AGENT, decode, decode_file, transport_error};
use async_trait::async_trait;
use porter_core::{Clock, Observed, Platform, RepositoryRef, SystemClock};
use porter_error::ApiError;
use porter_interface::{
    AccessToken, BranchRef, ChangeRequest, ChangeRequestDraft, CommitRef, RepositoryMetadata,
    VcsPlatform,
};
use porter_rate_limit::HeaderQuotaDetector;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path_with_namespace: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    http_url_to_repo: String,
}

impl From<GitLabProject> for RepositoryMetadata {
    fn from(project: GitLabProject) -> Self {
        Self {
            full_name: project.path_with_namespace,
            default_branch: project.default_branch.unwrap_or_else(|| "main".to_string()),
            head_sha: None,
            private: project.visibility.as_deref() != Some("public"),
            language: None,
            clone_url: project.http_url_to_repo,
            build_tool: None,
            java_version: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GitLabBranch {
    name: String,
    commit: GitLabCommit,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    web_url: String,
}

/// GitLab (SaaS or self-managed) REST client.
///
/// Projects are addressed by their URL-encoded full path, so nested groups
/// work without a lookup.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    api_base: Option<String>,
    git: GitCli,
    detector: HeaderQuotaDetector,
    clock: Arc<dyn Clock>,
}

impl GitLabClient {
    /// Create a client that pushes with `git`.
    pub fn new(git: GitCli) -> Self {
        debug!("Creating new GitLab client");
        Self {
            http: Client::new(),
            api_base: None,
            git,
            detector: HeaderQuotaDetector::new(Platform::GitLab),
            clock: Arc::new(SystemClock),
        }
    }

    /// Send every request to `api_base` instead of `https://<host>/api/v4`.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into().trim_end_matches('/').to_string());
        self
    }

    /// Judge `retry-after` against `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn project_url(&self, repository: &RepositoryRef, path: &str) -> String {
        let base = self
            .api_base
            .clone()
            .unwrap_or_else(|| repository.api_base());
        format!(
            "{}/projects/{}{}",
            base,
            project_id(repository),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        request
            .header("private-token", token.expose())
            .header("user-agent", USER_AGENT)
    }
}

/// URL-encoded `group/sub/name`. Path segments are restricted to
/// `[A-Za-z0-9_.-]`, so only the separators need encoding.
fn project_id(repository: &RepositoryRef) -> String {
    repository.full_name().replace('/', "%2F")
}

#[async_trait]
impl VcsPlatform for GitLabClient {
    #[instrument(skip(self, token), fields(repository = %repository))]
    async fn get_repository(
        &self,
        repository: &RepositoryRef,
        token: &AccessToken,
    ) -> Result<Observed<RepositoryMetadata>, ApiError> {
        let response = self
            .authorized(self.http.get(self.project_url(repository, "")), token)
            .send()
            .await
            .map_err(transport_error)?;
        let project: Observed<GitLabProject> =
            decode(response, &self.detector, self.clock.now()).await?;
        Ok(project.map(RepositoryMetadata::from))
    }

    #[instrument(skip(self, token), fields(repository = %repository))]
    async fn get_file(
        &self,
        repository: &RepositoryRef,
        path: &str,
        git_ref: &str,
        token: &AccessToken,
    ) -> Result<Observed<Option<String>>, ApiError> {
        let url = self.project_url(
            repository,
            &format!("/repository/files/{}/raw", path.replace('/', "%2F")),
        );
        let response = self
            .authorized(self.http.get(url).query(&[("ref", git_ref)]), token)
            .send()
            .await
            .map_err(transport_error)?;
        decode_file(response, &self.detector, self.clock.now()).await
    }

    #[instrument(skip(self, token), fields(repository = %repository))]
    async fn create_branch(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        from_sha: &str,
        token: &AccessToken,
    ) -> Result<Observed<BranchRef>, ApiError> {
        let response = self
            .authorized(
                self.http
                    .post(self.project_url(repository, "/repository/branches"))
                    .query(&[("branch", branch), ("ref", from_sha)]),
                token,
            )
            .send()
            .await
            .map_err(transport_error)?;
        let created: Observed<GitLabBranch> =
            decode(response, &self.detector, self.clock.now()).await?;
        Ok(created.map(|b| BranchRef {
            name: b.name,
            sha: b.commit.id,
        }))
    }

    #[instrument(skip(self, checkout, message, token), fields(repository = %repository))]
    async fn push_commit(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        checkout: &Path,
        message: &str,
        token: &AccessToken,
    ) -> Result<Observed<CommitRef>, ApiError> {
        let commit = self.git.commit_all(checkout, message).await?;
        self.git.push(repository, checkout, branch, token).await?;
        Ok(Observed::bare(commit))
    }

    #[instrument(skip(self, draft, token), fields(repository = %repository, head = %draft.head_branch()))]
    async fn open_change_request(
        &self,
        repository: &RepositoryRef,
        draft: &ChangeRequestDraft,
        token: &AccessToken,
    ) -> Result<Observed<ChangeRequest>, ApiError> {
        let body = serde_json::json!({
            "source_branch": draft.head_branch(),
            "target_branch": draft.base_branch(),
            "title": draft.title(),
            "description": draft.body(),
            "remove_source_branch": true,
        });
        let response = self
            .authorized(
                self.http
                    .post(self.project_url(repository, "/merge_requests")),
                token,
            )
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let merge_request: Observed<GitLabMergeRequest> =
            decode(response, &self.detector, self.clock.now()).await?;
        Ok(merge_request.map(|mr| ChangeRequest {
            number: mr.iid,
            url: mr.web_url,
        }))
    }

    fn name(&self) -> &'static str {
        "gitlab"
    }
}
