//! Wiring of concrete collaborators into an orchestrator.

use porter_core::{Clock, CredentialRef, Platform, SystemClock};
use porter_interface::VcsPlatform;
use porter_jobs::InMemoryJobStore;
use porter_orchestrator::MigrationOrchestrator;
use porter_platform::{
    EnvCredentials, GitCli, GitHubClient, GitLabClient, LogNotifier, ProcessEngine,
};
use porter_rate_limit::{PorterConfig, RateLimitedClient};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Build an orchestrator backed by the real GitHub and GitLab clients, the
/// `git` executable, the configured transformation command, an in-memory
/// job store and environment-variable credentials.
///
/// Platform API bases come from `[platforms.github]` and
/// `[platforms.gitlab]`; a repository on an Enterprise or self-managed host
/// is addressed through its own host whenever no override is configured.
#[instrument(skip(config))]
pub fn build_orchestrator(config: &PorterConfig) -> MigrationOrchestrator {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = RateLimitedClient::from_config(config, clock.clone());
    let git = GitCli::new();
    let engine = ProcessEngine::from_settings(&config.engine);
    debug!(engine = %engine.command(), "Assembling orchestrator");

    MigrationOrchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        client,
        Arc::new(git.clone()),
        Arc::new(engine),
        Arc::new(EnvCredentials::new()),
    )
    .with_platform(
        Platform::GitHub,
        platform_client(config, Platform::GitHub, git.clone(), clock.clone()),
    )
    .with_platform(
        Platform::GitLab,
        platform_client(config, Platform::GitLab, git, clock.clone()),
    )
    .with_notifier(Arc::new(LogNotifier))
    .with_settings(config.orchestrator.clone())
    .with_clock(clock)
}

/// REST client for `platform`, honouring a configured `api_base` override.
pub fn platform_client(
    config: &PorterConfig,
    platform: Platform,
    git: GitCli,
    clock: Arc<dyn Clock>,
) -> Arc<dyn VcsPlatform> {
    let api_base = config
        .platform(&platform.to_string())
        .and_then(|settings| settings.api_base.clone());
    match platform {
        Platform::GitHub => {
            let client = GitHubClient::new(git).with_clock(clock);
            match api_base {
                Some(api_base) => Arc::new(client.with_api_base(api_base)),
                None => Arc::new(client),
            }
        }
        Platform::GitLab => {
            let client = GitLabClient::new(git).with_clock(clock);
            match api_base {
                Some(api_base) => Arc::new(client.with_api_base(api_base)),
                None => Arc::new(client),
            }
        }
    }
}

/// Credential used for `platform` when the caller names none: the
/// configured `token_env`, else `GITHUB_TOKEN` or `GITLAB_TOKEN`.
pub fn default_credential(config: &PorterConfig, platform: Platform) -> CredentialRef {
    let name = platform.to_string();
    match config.platform(&name) {
        Some(settings) if !settings.token_env.is_empty() => {
            CredentialRef::new(settings.token_env.clone())
        }
        _ => CredentialRef::new(format!("{}_TOKEN", name.to_uppercase())),
    }
}
