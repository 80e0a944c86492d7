//! Migration command handler.

use super::commands::RunArgs;
use porter::{
    CredentialRef, Job, JobId, JobResult, MigrationError, MigrationOrchestrator,
    MigrationRequestBuilder, PorterConfig, PorterResult, RepositoryRef, build_orchestrator,
    default_credential, upgrade_directives,
};
use std::time::Duration;
use tracing::{info, warn};

/// How often the job record is re-read while following a run.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Start a migration and print its progress until it reaches a terminal
/// state. Ctrl-C cancels the job and keeps following it to `Failed`.
///
/// # Errors
///
/// Returns the job's classified failure if it did not complete, or the
/// submission error if the request was rejected.
pub async fn run_migration(mut config: PorterConfig, args: RunArgs) -> PorterResult<()> {
    if let Some(workspace) = args.workspace {
        config.orchestrator = config.orchestrator.with_workspace_root(workspace);
    }

    let repository = RepositoryRef::parse(&args.repository, None)?;
    let credential = match args.credential {
        Some(name) => CredentialRef::new(name),
        None => default_credential(&config, repository.platform),
    };
    let directives = if args.directives.is_empty() {
        upgrade_directives(args.source, args.target)
            .into_iter()
            .map(|directive| directive.as_str().to_string())
            .collect()
    } else {
        args.directives
    };

    let request = MigrationRequestBuilder::default()
        .repository_url(repository.canonical())
        .platform(Some(repository.platform))
        .credential(credential)
        .source_version(Some(args.source))
        .target_version(args.target)
        .directives(directives)
        .branch_name(args.branch)
        .notify(args.notify)
        .force_refresh(args.force_refresh)
        .build()?;

    let orchestrator = build_orchestrator(&config);
    let id = orchestrator.start_job(request).await?;
    println!("Started job {} for {}", id, repository.canonical());

    let job = follow(&orchestrator, id).await?;
    println!("Quota: {}", orchestrator.quota_status_line().await);

    match job.result() {
        Some(JobResult::Completed(report)) => {
            println!("Completed: {}", report.summary);
            println!("Change request: {}", report.change_request_url);
            println!("Branch: {}", report.branch);
            if let Some(path) = &report.report_path {
                println!("Report: {}", path.display());
            }
            Ok(())
        }
        Some(JobResult::Failed(report)) => {
            println!("Failed in {}: {} ({})", report.failed_state, report.message, report.kind);
            for line in &report.diagnostics {
                println!("  {}", line);
            }
            if let Some(url) = &report.change_request_url {
                println!("Change request left open: {}", url);
            }
            Err(MigrationError::new(report.kind, report.message.clone()).into())
        }
        None => Ok(()),
    }
}

/// Poll `id`, printing each new progress entry, until the job is terminal.
async fn follow(orchestrator: &MigrationOrchestrator, id: JobId) -> PorterResult<Job> {
    let mut printed = 0;
    let mut cancelled = false;
    loop {
        let job = orchestrator.get_job_status(id).await?;
        for entry in job.progress().iter().skip(printed) {
            match &entry.detail {
                Some(detail) => println!(
                    "[{}] {}: {}",
                    entry.at.format("%H:%M:%S"),
                    entry.state,
                    detail
                ),
                None => println!("[{}] {}", entry.at.format("%H:%M:%S"), entry.state),
            }
        }
        printed = job.progress().len();
        if job.is_terminal() {
            info!(job_id = %id, state = %job.state(), "Job finished");
            return Ok(job);
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            signal = tokio::signal::ctrl_c(), if !cancelled => {
                cancelled = true;
                match signal {
                    Ok(()) => {
                        println!("Cancelling job {}", id);
                        orchestrator.cancel_job(id).await?;
                    }
                    Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
                }
            }
        }
    }
}
