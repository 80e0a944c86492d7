//! Per-job state machine driver.

use crate::{JobWorkspace, MigrationReport, change_request_body};
use porter_cache::Fingerprint;
use porter_core::{
    BUILD_FILES, BuildTool, CancelToken, Clock, CompletionReport, Endpoint, FailureReport, Job,
    JobId, JobState, MigrationRequest, Platform, RepositoryRef, TransformOutput,
};
use porter_error::{FailureKind, MigrationError};
use porter_interface::{
    AccessToken, ChangeRequest, ChangeRequestDraftBuilder, CredentialStore, Notice, Notifier,
    RepositoryCloner, RepositoryMetadata, TransformationEngine, VcsPlatform,
};
use porter_jobs::JobStore;
use porter_rate_limit::{Idempotency, OrchestratorSettings, RateLimitedClient};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Everything a job task needs, shared by every job of one orchestrator.
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) client: RateLimitedClient,
    pub(crate) platforms: HashMap<Platform, Arc<dyn VcsPlatform>>,
    pub(crate) cloner: Arc<dyn RepositoryCloner>,
    pub(crate) engine: Arc<dyn TransformationEngine>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) settings: OrchestratorSettings,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Drive a claimed job (already in `Analyzing`) to a terminal state.
pub(crate) async fn drive(parts: Collaborators, job: Job, cancel: CancelToken) {
    match Pipeline::new(parts.clone(), &job, cancel) {
        Ok(pipeline) => pipeline.run().await,
        Err(err) => record_failure(&parts, job.id(), JobState::Analyzing, err, None).await,
    }
}

/// Record a terminal failure. Nothing escapes: store errors are logged.
async fn record_failure(
    parts: &Collaborators,
    job_id: JobId,
    state: JobState,
    err: MigrationError,
    change_request_url: Option<String>,
) {
    error!(
        job_id = %job_id,
        state = %state,
        kind = %err.kind,
        error = %err.message,
        "Job failed"
    );
    let report = FailureReport {
        kind: err.kind,
        message: err.message,
        failed_state: state,
        diagnostics: err.diagnostics,
        change_request_url,
    };
    if let Err(e) = parts.store.fail(job_id, report, parts.clock.now()).await {
        warn!(job_id = %job_id, error = %e, "Could not record failure");
    }
}

struct Pipeline {
    parts: Collaborators,
    job_id: JobId,
    request: MigrationRequest,
    repository: RepositoryRef,
    platform: Arc<dyn VcsPlatform>,
    token: AccessToken,
    cancel: CancelToken,
    metadata: Option<RepositoryMetadata>,
    workspace: Option<JobWorkspace>,
    head_sha: Option<String>,
    output: Option<TransformOutput>,
    summary: Option<String>,
    report_path: Option<PathBuf>,
    branch: Option<String>,
    change_request: Option<ChangeRequest>,
}

impl Pipeline {
    fn new(parts: Collaborators, job: &Job, cancel: CancelToken) -> Result<Self, MigrationError> {
        let repository = job.repository().clone();
        let platform = parts
            .platforms
            .get(&repository.platform)
            .cloned()
            .ok_or_else(|| {
                MigrationError::new(
                    FailureKind::PlatformRejected,
                    format!("no {} client configured", repository.platform),
                )
            })?;
        let token = parts
            .credentials
            .resolve(job.request().credential())
            .ok_or_else(|| {
                MigrationError::new(
                    FailureKind::PlatformRejected,
                    format!(
                        "credential '{}' can no longer be resolved",
                        job.request().credential()
                    ),
                )
            })?;
        Ok(Self {
            parts,
            job_id: job.id(),
            request: job.request().clone(),
            repository,
            platform,
            token,
            cancel,
            metadata: None,
            workspace: None,
            head_sha: None,
            output: None,
            summary: None,
            report_path: None,
            branch: None,
            change_request: None,
        })
    }

    #[instrument(skip(self), fields(job_id = %self.job_id, repository = %self.repository))]
    async fn run(mut self) {
        let mut state = JobState::Analyzing;
        info!("Job started");
        loop {
            if self.cancel.is_cancelled() {
                self.fail(state, MigrationError::cancelled()).await;
                break;
            }

            let detail = match self.guarded(state).await {
                Ok(detail) => detail,
                Err(err) if state == JobState::Notifying && err.kind != FailureKind::Cancelled => {
                    warn!(error = %err, "Notification failed, completing anyway");
                    None
                }
                Err(err) => {
                    self.fail(state, err).await;
                    break;
                }
            };

            match state.next() {
                Some(JobState::Completed) => {
                    self.complete().await;
                    break;
                }
                Some(next) => {
                    let at = self.parts.clock.now();
                    if let Err(e) = self.parts.store.transition(self.job_id, next, at, detail).await {
                        error!(error = %e, "Job store refused transition, abandoning job");
                        break;
                    }
                    info!(from = %state, to = %next, "Job advanced");
                    state = next;
                }
                None => break,
            }
        }
        self.cleanup().await;
    }

    /// Run the action of `state` under its timeout ceiling, racing the
    /// cancel token.
    async fn guarded(&mut self, state: JobState) -> Result<Option<String>, MigrationError> {
        let ceiling = self.parts.settings.timeout_for(state);
        let cancel = self.cancel.clone();
        let action = async {
            match ceiling {
                Some(ceiling) => tokio::time::timeout(ceiling, self.execute(state))
                    .await
                    .unwrap_or_else(|_| Err(timeout_error(state, ceiling))),
                None => self.execute(state).await,
            }
        };
        tokio::select! {
            result = action => result,
            _ = cancel.cancelled() => Err(MigrationError::cancelled()),
        }
    }

    async fn execute(&mut self, state: JobState) -> Result<Option<String>, MigrationError> {
        debug!(state = %state, "Running state action");
        match state {
            JobState::Analyzing => self.analyze().await,
            JobState::Cloning => self.clone_repository().await,
            JobState::Transforming => self.transform().await,
            JobState::Reporting => self.report().await,
            JobState::Publishing => self.publish().await,
            JobState::Notifying => self.notify().await,
            JobState::Pending | JobState::Completed | JobState::Failed => Ok(None),
        }
    }

    async fn analyze(&mut self) -> Result<Option<String>, MigrationError> {
        let platform = &self.platform;
        let repository = &self.repository;
        let token = &self.token;
        let force_refresh = *self.request.force_refresh();
        let key = Fingerprint::for_repository("analysis", repository);
        let mut metadata: RepositoryMetadata = self
            .parts
            .client
            .call(
                Endpoint::Core,
                Idempotency::read(key, force_refresh),
                &self.cancel,
                || platform.get_repository(repository, token),
            )
            .await?;

        let branch = metadata.default_branch.clone();
        for name in BUILD_FILES {
            let Some(tool) = BuildTool::for_file(name) else {
                continue;
            };
            let key = Fingerprint::for_repository(&format!("build-file:{}", name), repository);
            let content: Option<String> = self
                .parts
                .client
                .call(
                    Endpoint::Core,
                    Idempotency::read(key, force_refresh),
                    &self.cancel,
                    || platform.get_file(repository, name, &branch, token),
                )
                .await?;
            if let Some(content) = content {
                metadata.build_tool = Some(tool);
                metadata.java_version = tool.detect_java_version(&content);
                break;
            }
        }

        debug!(
            default_branch = %metadata.default_branch,
            language = ?metadata.language,
            build_tool = ?metadata.build_tool,
            java_version = ?metadata.java_version,
            "Analyzed repository"
        );
        let target = *self.request.target_version();
        if let Some(current) = metadata.java_version
            && current >= target
        {
            warn!(current, target, "Build already targets the requested release");
        }
        let detail = match (metadata.build_tool, metadata.java_version) {
            (Some(tool), Some(version)) => {
                format!("default branch {}, {}, Java {}", branch, tool, version)
            }
            (Some(tool), None) => {
                format!("default branch {}, {}, Java version not declared", branch, tool)
            }
            (None, _) => format!("default branch {}, no build file found", branch),
        };
        self.metadata = Some(metadata);
        Ok(Some(detail))
    }

    async fn clone_repository(&mut self) -> Result<Option<String>, MigrationError> {
        let branch = self.metadata()?.default_branch.clone();
        let workspace =
            JobWorkspace::prepare(self.parts.settings.workspace_root(), self.job_id).await?;
        let checkout = workspace.checkout();
        self.workspace = Some(workspace);

        let head = self
            .parts
            .cloner
            .clone_repository(&self.repository, &branch, &checkout, &self.token)
            .await?;
        debug!(head = %head.sha, "Cloned repository");
        let detail = format!("checked out {} at {}", branch, head.sha);
        self.head_sha = Some(head.sha);
        Ok(Some(detail))
    }

    async fn transform(&mut self) -> Result<Option<String>, MigrationError> {
        let checkout = self.workspace()?.checkout();
        let directives = self
            .request
            .directive_list()
            .map_err(|e| MigrationError::new(FailureKind::InvalidRequest, e.to_string()))?;

        let output = self.parts.engine.transform(&checkout, &directives).await?;
        if output.change_set.is_empty() {
            return Err(MigrationError::new(
                FailureKind::TransformationFailure,
                "directives produced no changes",
            )
            .with_diagnostics(output.report.notes.clone()));
        }
        let detail = format!("{} files changed", output.change_set.len());
        self.output = Some(output);
        Ok(Some(detail))
    }

    async fn report(&mut self) -> Result<Option<String>, MigrationError> {
        let output = self.output()?.clone();
        let mut report = MigrationReport::new(
            self.job_id,
            self.repository.clone(),
            &self.request,
            output,
            self.parts.clock.now(),
        );
        if report.source_version.is_none() {
            report.source_version = self.metadata.as_ref().and_then(|m| m.java_version);
        }
        let path = report
            .write(&self.parts.settings.workspace_root().join("reports"))
            .await?;
        let detail = report.summary.clone();
        self.summary = Some(report.summary);
        self.report_path = Some(path);
        Ok(Some(detail))
    }

    async fn publish(&mut self) -> Result<Option<String>, MigrationError> {
        let metadata = self.metadata()?.clone();
        let head_sha = self
            .head_sha
            .clone()
            .or(metadata.head_sha.clone())
            .ok_or_else(|| missing("head commit"))?;
        let checkout = self.workspace()?.checkout();
        let output = self.output()?;
        let summary = self.summary.clone().unwrap_or_default();
        let branch = self.branch_name();
        let target = *self.request.target_version();

        let draft = ChangeRequestDraftBuilder::default()
            .title(format!("Migrate to Java {}", target))
            .body(change_request_body(self.job_id, &self.request, output))
            .head_branch(branch.clone())
            .base_branch(metadata.default_branch.clone())
            .build()
            .map_err(|e| MigrationError::new(FailureKind::InvalidRequest, e.to_string()))?;
        let message = format!("Migrate to Java {}\n\n{}", target, summary);

        let client = &self.parts.client;
        let platform = &self.platform;
        let repository = &self.repository;
        let token = &self.token;
        let cancel = &self.cancel;

        let created = client
            .call(Endpoint::Core, Idempotency::Mutating, cancel, || {
                platform.create_branch(repository, &branch, &head_sha, token)
            })
            .await?;
        debug!(branch = %created.name, sha = %created.sha, "Created branch");

        let pushed = client
            .call(Endpoint::Core, Idempotency::Mutating, cancel, || {
                platform.push_commit(repository, &branch, &checkout, &message, token)
            })
            .await?;
        debug!(sha = %pushed.sha, "Pushed migration commit");

        let change_request = client
            .call(Endpoint::Core, Idempotency::Mutating, cancel, || {
                platform.open_change_request(repository, &draft, token)
            })
            .await?;
        info!(url = %change_request.url, "Opened change request");

        let detail = change_request.url.clone();
        self.branch = Some(branch);
        self.change_request = Some(change_request);
        Ok(Some(detail))
    }

    async fn notify(&mut self) -> Result<Option<String>, MigrationError> {
        let (Some(notifier), Some(recipient)) = (&self.parts.notifier, self.request.notify())
        else {
            debug!("No notification requested");
            return Ok(None);
        };
        let notice = Notice {
            job_id: self.job_id,
            recipient: recipient.clone(),
            repository: self.repository.clone(),
            state: JobState::Notifying,
            summary: self.summary.clone().unwrap_or_default(),
            change_request_url: self.change_request.as_ref().map(|cr| cr.url.clone()),
        };
        notifier.notify(&notice).await?;
        Ok(Some(format!("notified {}", recipient)))
    }

    async fn complete(&self) {
        let Some(change_request) = &self.change_request else {
            self.fail(JobState::Notifying, missing("change request")).await;
            return;
        };
        let report = CompletionReport {
            change_request_url: change_request.url.clone(),
            branch: self.branch.clone().unwrap_or_default(),
            report_path: self.report_path.clone(),
            summary: self.summary.clone().unwrap_or_default(),
        };
        match self
            .parts
            .store
            .complete(self.job_id, report, self.parts.clock.now())
            .await
        {
            Ok(_) => info!(url = %change_request.url, "Job completed"),
            Err(e) => error!(error = %e, "Could not record completion"),
        }
    }

    async fn fail(&self, state: JobState, err: MigrationError) {
        let url = self.change_request.as_ref().map(|cr| cr.url.clone());
        record_failure(&self.parts, self.job_id, state, err, url).await;
    }

    async fn cleanup(&self) {
        if let Some(workspace) = &self.workspace
            && *self.parts.settings.cleanup_workspace()
        {
            workspace.remove().await;
        }
    }

    fn branch_name(&self) -> String {
        match self.request.branch_name() {
            Some(name) => name.clone(),
            None => {
                let id = self.job_id.to_string();
                format!(
                    "{}-{}-{}",
                    self.parts.settings.branch_prefix(),
                    self.request.target_version(),
                    &id[..8]
                )
            }
        }
    }

    fn metadata(&self) -> Result<&RepositoryMetadata, MigrationError> {
        self.metadata.as_ref().ok_or_else(|| missing("repository metadata"))
    }

    fn workspace(&self) -> Result<&JobWorkspace, MigrationError> {
        self.workspace.as_ref().ok_or_else(|| missing("workspace"))
    }

    fn output(&self) -> Result<&TransformOutput, MigrationError> {
        self.output.as_ref().ok_or_else(|| missing("transformation output"))
    }
}

fn missing(what: &str) -> MigrationError {
    MigrationError::new(
        FailureKind::Workspace,
        format!("{} missing from an earlier state", what),
    )
}

fn timeout_error(state: JobState, ceiling: Duration) -> MigrationError {
    MigrationError::new(
        FailureKind::TransientNetwork,
        format!("{} exceeded its {}s ceiling", state, ceiling.as_secs()),
    )
}
