//! GitHub REST client.

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

const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    full_name: String,
    default_branch: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    language: Option<String>,
    clone_url: String,
}

impl From<GitHubRepository> for RepositoryMetadata {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            full_name: repo.full_name,
            default_branch: repo.default_branch,
            head_sha: None,
            private: repo.private,
            language: repo.language,
            clone_url: repo.clone_url,
            build_tool: None,
            java_version: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    reference: String,
    object: GitHubObject,
}

impl From<GitHubRef> for BranchRef {
    fn from(r: GitHubRef) -> Self {
        let name = r
            .reference
            .strip_prefix("refs/heads/")
            .unwrap_or(&r.reference)
            .to_string();
        Self {
            name,
            sha: r.object.sha,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubPull {
    number: u64,
    html_url: String,
}

/// GitHub and GitHub Enterprise REST client.
///
/// The API base comes from the repository host (`api.github.com`, or
/// `https://<host>/api/v3` for Enterprise) unless overridden.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: Option<String>,
    git: GitCli,
    detector: HeaderQuotaDetector,
    clock: Arc<dyn Clock>,
}

impl GitHubClient {
    /// Create a client that pushes with `git`.
    pub fn new(git: GitCli) -> Self {
        debug!("Creating new GitHub client");
        Self {
            http: Client::new(),
            api_base: None,
            git,
            detector: HeaderQuotaDetector::new(Platform::GitHub),
            clock: Arc::new(SystemClock),
        }
    }

    /// Send every request to `api_base` instead of the host-derived base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into().trim_end_matches('/').to_string());
        self
    }

    /// Judge `retry-after` against `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn repo_url(&self, repository: &RepositoryRef, path: &str) -> String {
        let base = self
            .api_base
            .clone()
            .unwrap_or_else(|| repository.api_base());
        format!(
            "{}/repos/{}/{}{}",
            base, repository.owner, repository.name, path
        )
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        self.authorized_as(request, token, "application/vnd.github+json")
    }

    fn authorized_as(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
        accept: &str,
    ) -> RequestBuilder {
        request
            .bearer_auth(token.expose())
            .header("accept", accept)
            .header("x-github-api-version", GITHUB_API_VERSION)
            .header("user-agent", USER_AGENT)
    }
}

#[async_trait]
impl VcsPlatform for GitHubClient {
    #[instrument(skip(self, token), fields(repository = %repository))]
    async fn get_repository(
        &self,
        repository: &RepositoryRef,
        token: &AccessToken,
    ) -> Result<Observed<RepositoryMetadata>, ApiError> {
        let response = self
            .authorized(self.http.get(self.repo_url(repository, "")), token)
            .send()
            .await
            .map_err(transport_error)?;
        let repo: Observed<GitHubRepository> =
            decode(response, &self.detector, self.clock.now()).await?;
        Ok(repo.map(RepositoryMetadata::from))
    }

    #[instrument(skip(self, token), fields(repository = %repository))]
    async fn get_file(
        &self,
        repository: &RepositoryRef,
        path: &str,
        git_ref: &str,
        token: &AccessToken,
    ) -> Result<Observed<Option<String>>, ApiError> {
        let url = self.repo_url(repository, &format!("/contents/{}", path));
        let response = self
            .authorized_as(
                self.http.get(url).query(&[("ref", git_ref)]),
                token,
                "application/vnd.github.raw+json",
            )
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
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": from_sha,
        });
        let response = self
            .authorized(self.http.post(self.repo_url(repository, "/git/refs")), token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let reference: Observed<GitHubRef> =
            decode(response, &self.detector, self.clock.now()).await?;
        Ok(reference.map(BranchRef::from))
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
            "title": draft.title(),
            "body": draft.body(),
            "head": draft.head_branch(),
            "base": draft.base_branch(),
        });
        let response = self
            .authorized(self.http.post(self.repo_url(repository, "/pulls")), token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let pull: Observed<GitHubPull> = decode(response, &self.detector, self.clock.now()).await?;
        Ok(pull.map(|pull| ChangeRequest {
            number: pull.number,
            url: pull.html_url,
        }))
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_payload() {
        let json = r#"{
            "id": 1296269,
            "full_name": "octocat/Hello-World",
            "default_branch": "master",
            "private": false,
            "language": "Java",
            "clone_url": "https://github.com/octocat/Hello-World.git"
        }"#;
        let repo: GitHubRepository = serde_json::from_str(json).unwrap();
        let metadata = RepositoryMetadata::from(repo);
        assert_eq!(metadata.full_name, "octocat/Hello-World");
        assert_eq!(metadata.default_branch, "master");
        assert_eq!(metadata.language.as_deref(), Some("Java"));
    }

    #[test]
    fn test_ref_payload_strips_prefix() {
        let json = r#"{
            "ref": "refs/heads/porter/java-17",
            "node_id": "MDM6UmVmcmVmcy9oZWFkcy9mZWF0dXJlQQ==",
            "object": { "type": "commit", "sha": "aa218f56b14c9653891f9e74264a383fa43fefbd" }
        }"#;
        let reference: GitHubRef = serde_json::from_str(json).unwrap();
        let branch = BranchRef::from(reference);
        assert_eq!(branch.name, "porter/java-17");
        assert_eq!(branch.sha, "aa218f56b14c9653891f9e74264a383fa43fefbd");
    }

    #[test]
    fn test_enterprise_urls() {
        let client = GitHubClient::new(GitCli::new());
        let public = RepositoryRef::parse("org/repo", None).unwrap();
        assert_eq!(
            client.repo_url(&public, "/pulls"),
            "https://api.github.com/repos/org/repo/pulls"
        );

        let enterprise =
            RepositoryRef::parse("https://github.acme.com/team/service", None).unwrap();
        assert_eq!(
            client.repo_url(&enterprise, ""),
            "https://github.acme.com/api/v3/repos/team/service"
        );

        let overridden = client.with_api_base("http://localhost:8080/");
        assert_eq!(
            overridden.repo_url(&public, ""),
            "http://localhost:8080/repos/org/repo"
        );
    }
}
