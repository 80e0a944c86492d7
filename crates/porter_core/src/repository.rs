//! Repository references and source-control platforms.

use porter_error::JobError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Valid path segment regex"));

/// Source-control platform hosting a repository.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    /// github.com or a GitHub Enterprise host
    GitHub,
    /// gitlab.com or a self-managed GitLab host
    GitLab,
}

impl Platform {
    /// Public host used when a reference carries no host.
    pub fn default_host(&self) -> &'static str {
        match self {
            Platform::GitHub => "github.com",
            Platform::GitLab => "gitlab.com",
        }
    }

    fn infer(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host.contains("gitlab") {
            Some(Platform::GitLab)
        } else if host.contains("github") {
            Some(Platform::GitHub)
        } else {
            None
        }
    }
}

/// A parsed, validated repository location.
///
/// # Examples
///
/// ```
/// use porter_core::{Platform, RepositoryRef};
///
/// let repo = RepositoryRef::parse("https://github.com/Acme/Billing.git", None).unwrap();
/// assert_eq!(repo.platform, Platform::GitHub);
/// assert_eq!(repo.full_name(), "Acme/Billing");
/// assert_eq!(repo.canonical(), "github.com/acme/billing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Hosting platform
    pub platform: Platform,
    /// Host name, e.g. `github.com`
    pub host: String,
    /// Owner, organization, or (for GitLab) the full group path
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepositoryRef {
    /// Parse a repository reference.
    ///
    /// Accepts `owner/repo`, `http(s)://host/owner/repo(.git)`,
    /// `ssh://git@host/owner/repo.git` and `git@host:owner/repo.git`. GitLab
    /// references may carry nested groups. The `platform` hint wins over
    /// host-based inference.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidRequest` job error if the reference is malformed or
    /// the platform cannot be determined.
    pub fn parse(reference: &str, platform: Option<Platform>) -> Result<Self, JobError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(JobError::invalid_request("repository reference is empty"));
        }

        let (host, path) = split_host(trimmed)?;
        let shorthand = host.is_none();
        let platform = match (platform, host.as_deref()) {
            (Some(p), _) => p,
            (None, Some(h)) => Platform::infer(h).ok_or_else(|| {
                JobError::invalid_request(format!(
                    "cannot infer platform from host '{}'; pass it explicitly",
                    h
                ))
            })?,
            (None, None) => Platform::GitHub,
        };
        let host = host.unwrap_or_else(|| platform.default_host().to_string());

        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match platform {
            Platform::GitHub if shorthand && segments.len() > 2 => {
                return Err(JobError::invalid_request(format!(
                    "'{}' is not an owner/repo shorthand",
                    reference
                )));
            }
            Platform::GitHub => segments.truncate(2),
            Platform::GitLab => {
                if let Some(pos) = segments.iter().position(|s| *s == "-") {
                    segments.truncate(pos);
                }
            }
        }

        if segments.len() < 2 {
            return Err(JobError::invalid_request(format!(
                "repository reference '{}' must name an owner and a repository",
                reference
            )));
        }
        if let Some(bad) = segments
            .iter()
            .find(|s| !SEGMENT.is_match(s) || **s == "." || **s == "..")
        {
            return Err(JobError::invalid_request(format!(
                "invalid path segment '{}' in repository reference",
                bad
            )));
        }

        let (name, owner) = segments
            .split_last()
            .map(|(name, owner)| (name.to_string(), owner.join("/")))
            .ok_or_else(|| JobError::invalid_request("repository reference has no name"))?;

        Ok(Self {
            platform,
            host: host.to_ascii_lowercase(),
            owner,
            name,
        })
    }

    /// `owner/name` as the platform displays it.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Case-folded `host/owner/name`, used for cache fingerprints.
    pub fn canonical(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.name).to_ascii_lowercase()
    }

    /// Browser URL of the repository.
    pub fn web_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.name)
    }

    /// HTTPS clone URL.
    pub fn clone_url(&self) -> String {
        format!("{}.git", self.web_url())
    }

    /// REST API base for the repository's host.
    pub fn api_base(&self) -> String {
        match (self.platform, self.host.as_str()) {
            (Platform::GitHub, "github.com") => "https://api.github.com".to_string(),
            (Platform::GitHub, host) => format!("https://{}/api/v3", host),
            (Platform::GitLab, host) => format!("https://{}/api/v4", host),
        }
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

/// Split a reference into an optional host and the path that follows it.
fn split_host(reference: &str) -> Result<(Option<String>, &str), JobError> {
    if let Some(rest) = reference.strip_prefix("git@") {
        let (host, path) = rest.split_once(':').ok_or_else(|| {
            JobError::invalid_request(format!("malformed scp-style reference '{}'", reference))
        })?;
        return Ok((Some(host.to_string()), path));
    }

    if let Some((scheme, rest)) = reference.split_once("://") {
        if !matches!(scheme, "http" | "https" | "ssh" | "git") {
            return Err(JobError::invalid_request(format!(
                "unsupported scheme '{}' in repository reference",
                scheme
            )));
        }
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            return Err(JobError::invalid_request(format!(
                "repository reference '{}' has no host",
                reference
            )));
        }
        return Ok((Some(host.to_string()), path));
    }

    if reference.contains(':') {
        return Err(JobError::invalid_request(format!(
            "unrecognized repository reference '{}'",
            reference
        )));
    }
    Ok((None, reference))
}
