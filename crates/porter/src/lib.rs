//! Porter: rate-limited Java migrations across GitHub and GitLab.
//!
//! Porter clones a repository, runs a transformation engine over it, and
//! publishes the result as a pull request or merge request. Every platform
//! call shares one quota tracker, one result cache and one retry policy, so
//! many jobs can run side by side without tripping the platform's limits.
//!
//! # Architecture
//!
//! - **porter_error**: error kinds and the failure taxonomy
//! - **porter_core**: repository references, requests, jobs, quota snapshots
//! - **porter_cache**: TTL result cache for idempotent reads
//! - **porter_rate_limit**: quota tracker, backoff and the rate-limited client
//! - **porter_interface**: collaborator traits (platforms, cloner, engine)
//! - **porter_jobs**: job store
//! - **porter_orchestrator**: the job state machine driver
//! - **porter_platform**: GitHub, GitLab, git and engine implementations
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use porter::{MigrationRequestBuilder, PorterConfig, build_orchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PorterConfig::load()?;
//! let orchestrator = build_orchestrator(&config);
//!
//! let request = MigrationRequestBuilder::default()
//!     .repository_url("acme/billing")
//!     .credential("GITHUB_TOKEN")
//!     .target_version(17u32)
//!     .directives(vec!["org.openrewrite.java.migrate.UpgradeToJava17".to_string()])
//!     .build()?;
//!
//! let id = orchestrator.start_job(request).await?;
//! let job = orchestrator.wait(id).await?;
//! println!("{}: {}", job.id(), job.state());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod observability;
mod runtime;

pub use observability::{LoggingConfig, init_logging};
pub use runtime::{build_orchestrator, default_credential, platform_client};

// Re-export the workspace crates' public surface.
pub use porter_cache::{Fingerprint, ResultCache, ResultCacheConfig};
pub use porter_core::{
    BuildTool, CancelToken, Clock, CompletionReport, CredentialRef, Directive, Endpoint,
    FailureReport, Job, JobId, JobResult, JobState, ManualClock, MigrationRequest,
    MigrationRequestBuilder, Platform, ProgressEntry, QuotaState, RepositoryRef, SystemClock,
    TransformOutput, upgrade_directives, validate_directives,
};
pub use porter_error::{
    ApiError, ConfigError, FailureKind, JobError, JobErrorKind, MigrationError, PorterError,
    PorterErrorKind, PorterResult, ReportedQuota,
};
pub use porter_interface::{
    AccessToken, CredentialStore, Notifier, RepositoryCloner, RepositoryMetadata,
    TransformationEngine, VcsPlatform,
};
pub use porter_jobs::{InMemoryJobStore, JobFilter, JobStore};
pub use porter_orchestrator::{MigrationOrchestrator, MigrationReport};
pub use porter_platform::{
    EnvCredentials, GitCli, GitHubClient, GitLabClient, LogNotifier, ProcessEngine,
};
pub use porter_rate_limit::{
    Idempotency, OrchestratorSettings, PorterConfig, RateLimitTracker, RateLimitedClient,
};
