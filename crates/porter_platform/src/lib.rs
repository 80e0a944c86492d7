//! Concrete collaborators for the Porter orchestrator.
//!
//! - [`GitHubClient`] and [`GitLabClient`]: REST clients implementing
//!   [`porter_interface::VcsPlatform`]
//! - [`GitCli`]: clones, commits and pushes with the `git` executable
//! - [`ProcessEngine`]: runs an external transformation command
//! - [`LogNotifier`]: reports finished jobs to the log
//! - [`EnvCredentials`]: resolves credential references from the environment

#![warn(missing_docs)]

mod credentials;
mod engine;
mod git;
mod github;
mod gitlab;
mod http;
mod notifier;

pub use credentials::EnvCredentials;
pub use engine::ProcessEngine;
pub use git::GitCli;
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use http::{classify_response, transport_error};
pub use notifier::LogNotifier;
