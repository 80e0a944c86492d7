//! Git operations through the `git` executable.

use async_trait::async_trait;
use porter_core::{Platform, RepositoryRef};
use porter_error::{ApiError, ApiErrorKind};
use porter_interface::{AccessToken, CommitRef, RepositoryCloner};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Clones, commits and pushes by running `git`.
///
/// Credentials travel only inside the remote URL handed to `git`; they are
/// scrubbed from every error message.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    author_name: String,
    author_email: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            author_name: "Porter".to_string(),
            author_email: "porter@users.noreply.github.com".to_string(),
        }
    }
}

impl GitCli {
    /// Use `git` from `PATH` with the default commit identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a different executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Commit as `name <email>`.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    /// Stage everything in `checkout` and commit it.
    #[instrument(skip(self, checkout, message), fields(checkout = %checkout.display()))]
    pub async fn commit_all(&self, checkout: &Path, message: &str) -> Result<CommitRef, ApiError> {
        self.run(Some(checkout), &["add", "--all"], None).await?;
        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        self.run(
            Some(checkout),
            &["-c", name.as_str(), "-c", email.as_str(), "commit", "--quiet", "-m", message],
            None,
        )
        .await?;
        let sha = self.head(checkout).await?;
        debug!(sha = %sha, "Committed changes");
        Ok(CommitRef { sha })
    }

    /// Push `HEAD` of `checkout` to `branch` on the repository's remote.
    #[instrument(skip(self, checkout, token), fields(repository = %repository))]
    pub async fn push(
        &self,
        repository: &RepositoryRef,
        checkout: &Path,
        branch: &str,
        token: &AccessToken,
    ) -> Result<(), ApiError> {
        let url = authenticated_url(repository, token);
        let refspec = format!("HEAD:refs/heads/{}", branch);
        self.run(Some(checkout), &["push", url.as_str(), refspec.as_str()], Some(token))
            .await?;
        debug!("Pushed branch");
        Ok(())
    }

    async fn head(&self, checkout: &Path) -> Result<String, ApiError> {
        let out = self
            .run(Some(checkout), &["rev-parse", "HEAD"], None)
            .await?;
        Ok(out.trim().to_string())
    }

    async fn run(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        secret: Option<&AccessToken>,
    ) -> Result<String, ApiError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            ApiError::new(ApiErrorKind::Rejected {
                status: 0,
                message: format!("cannot run {}: {}", self.program, e),
            })
        })?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = scrub(&String::from_utf8_lossy(&output.stderr), secret);
        let code = output.status.code().unwrap_or(-1);
        warn!(code, stderr = %stderr.trim(), subcommand = ?args.first(), "git failed");
        Err(classify_git_failure(code, stderr.trim()))
    }
}

#[async_trait]
impl RepositoryCloner for GitCli {
    #[instrument(skip(self, destination, token), fields(repository = %repository))]
    async fn clone_repository(
        &self,
        repository: &RepositoryRef,
        branch: &str,
        destination: &Path,
        token: &AccessToken,
    ) -> Result<CommitRef, ApiError> {
        let url = authenticated_url(repository, token);
        let target = destination.to_string_lossy().into_owned();
        self.run(
            None,
            &[
                "clone",
                "--quiet",
                "--depth",
                "1",
                "--branch",
                branch,
                url.as_str(),
                target.as_str(),
            ],
            Some(token),
        )
        .await?;
        let sha = self.head(destination).await?;
        debug!(sha = %sha, "Cloned repository");
        Ok(CommitRef { sha })
    }
}

/// HTTPS remote URL carrying `token` as basic-auth credentials.
fn authenticated_url(repository: &RepositoryRef, token: &AccessToken) -> String {
    let user = match repository.platform {
        Platform::GitHub => "x-access-token",
        Platform::GitLab => "oauth2",
    };
    format!(
        "https://{}:{}@{}/{}/{}.git",
        user,
        token.expose(),
        repository.host,
        repository.owner,
        repository.name
    )
}

fn scrub(text: &str, secret: Option<&AccessToken>) -> String {
    match secret {
        Some(token) if !token.expose().is_empty() => text.replace(token.expose(), "***"),
        _ => text.to_string(),
    }
}

fn classify_git_failure(code: i32, stderr: &str) -> ApiError {
    let lower = stderr.to_ascii_lowercase();
    let kind = if lower.contains("could not resolve host")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("early eof")
    {
        ApiErrorKind::Network(stderr.to_string())
    } else if lower.contains("non-fast-forward")
        || lower.contains("[rejected]")
        || lower.contains("already exists")
    {
        ApiErrorKind::Conflict(stderr.to_string())
    } else {
        ApiErrorKind::Rejected {
            status: u16::try_from(code).unwrap_or(0),
            message: stderr.to_string(),
        }
    };
    ApiError::new(kind)
}
