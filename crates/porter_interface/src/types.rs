//! Payload types exchanged with collaborators.

use porter_core::{BuildTool, JobId, JobState, RepositoryRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved platform token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret, for placing in an authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Repository facts gathered during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// `owner/name` as the platform reports it
    pub full_name: String,
    /// Branch change requests target
    pub default_branch: String,
    /// Commit at the tip of the default branch, when reported
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Whether the repository is private
    #[serde(default)]
    pub private: bool,
    /// Primary language, when reported
    #[serde(default)]
    pub language: Option<String>,
    /// HTTPS clone URL
    pub clone_url: String,
    /// Build system, once a build file has been read
    #[serde(default)]
    pub build_tool: Option<BuildTool>,
    /// Java release the build file compiles for
    #[serde(default)]
    pub java_version: Option<u32>,
}

/// A branch on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name
    pub name: String,
    /// Commit the branch points at
    pub sha: String,
}

/// A commit on the platform or in a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// Commit hash
    pub sha: String,
}

/// An opened pull request or merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Platform-assigned number (PR number or MR iid)
    pub number: u64,
    /// Browser URL
    pub url: String,
}

/// What to open a change request with.
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
#[builder(setter(into))]
pub struct ChangeRequestDraft {
    /// Title
    title: String,
    /// Markdown body
    body: String,
    /// Branch carrying the change
    head_branch: String,
    /// Branch to merge into
    base_branch: String,
}

/// Message sent to the requester once a job finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Job that finished
    pub job_id: JobId,
    /// Who to tell
    pub recipient: String,
    /// Repository migrated
    pub repository: RepositoryRef,
    /// State the job is reporting from
    pub state: JobState,
    /// Change summary
    pub summary: String,
    /// Link to the change request
    pub change_request_url: Option<String>,
}
