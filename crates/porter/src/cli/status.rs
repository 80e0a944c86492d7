//! Quota and directive inspection handlers.

use porter::{
    CancelToken, Clock, CredentialRef, CredentialStore, Endpoint, EnvCredentials, Fingerprint,
    GitCli, Idempotency, JobError, PorterConfig, PorterResult, RateLimitedClient, RepositoryMetadata,
    RepositoryRef, SystemClock, default_credential, platform_client, upgrade_directives,
};
use std::sync::Arc;
use tracing::instrument;

/// Read `repository` once through the rate-limited client, then print what
/// the tracker learned about the platform's quota.
///
/// # Errors
///
/// Returns `InvalidRequest` for a malformed reference or an unset
/// credential, and the classified platform failure otherwise.
#[instrument(skip(config, credential))]
pub async fn show_quota(
    config: &PorterConfig,
    repository: &str,
    credential: Option<String>,
) -> PorterResult<()> {
    let repository = RepositoryRef::parse(repository, None)?;
    let credential = credential
        .map(CredentialRef::new)
        .unwrap_or_else(|| default_credential(config, repository.platform));
    let token = EnvCredentials::new().resolve(&credential).ok_or_else(|| {
        JobError::invalid_request(format!(
            "credential '{}' is not set",
            credential.as_str()
        ))
    })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = RateLimitedClient::from_config(config, clock.clone());
    let platform = platform_client(config, repository.platform, GitCli::new(), clock);
    let cancel = CancelToken::new();

    let metadata: RepositoryMetadata = client
        .call(
            Endpoint::Core,
            Idempotency::Refresh(Fingerprint::for_repository("analysis", &repository)),
            &cancel,
            || platform.get_repository(&repository, &token),
        )
        .await?;

    println!(
        "{} (default branch {}, {})",
        metadata.full_name,
        metadata.default_branch,
        if metadata.private { "private" } else { "public" }
    );
    println!("{}", client.tracker().status_line().await);
    if client.tracker().is_authenticated().await {
        println!("Credential tier: authenticated");
    } else {
        println!("Credential tier: unauthenticated or limited");
    }
    Ok(())
}

/// Print the directives that move a codebase from `source` to `target`.
pub fn print_directives(source: u32, target: u32) {
    for directive in upgrade_directives(source, target) {
        println!("{}", directive);
    }
}
