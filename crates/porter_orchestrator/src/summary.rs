//! Change summaries and the persisted migration report.

use chrono::{DateTime, Utc};
use porter_core::{ChangeKind, JobId, MigrationRequest, RepositoryRef, TransformOutput};
use porter_error::{FailureKind, MigrationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// One-line summary of a transformation, e.g.
/// `3 files changed (1 added, 2 modified, 0 deleted), 4 issues fixed`.
pub fn summarize(output: &TransformOutput) -> String {
    let changes = &output.change_set;
    let files = if changes.len() == 1 { "file" } else { "files" };
    format!(
        "{} {} changed ({} added, {} modified, {} deleted), {} issues fixed",
        changes.len(),
        files,
        changes.count(ChangeKind::Added),
        changes.count(ChangeKind::Modified),
        changes.count(ChangeKind::Deleted),
        output.report.issues_fixed
    )
}

/// Markdown body of the change request.
pub fn change_request_body(
    job_id: JobId,
    request: &MigrationRequest,
    output: &TransformOutput,
) -> String {
    let mut body = format!(
        "Automated migration to Java {}.\n\n{}\n\n### Directives\n",
        request.target_version(),
        summarize(output)
    );
    let applied = if output.report.directives_applied.is_empty() {
        request.directives()
    } else {
        &output.report.directives_applied
    };
    for directive in applied {
        body.push_str(&format!("- `{}`\n", directive));
    }
    if !output.change_set.is_empty() {
        body.push_str("\n### Files\n");
        for change in &output.change_set.files {
            body.push_str(&format!("- {} `{}`\n", change.kind, change.path.display()));
        }
    }
    if !output.report.notes.is_empty() {
        body.push_str("\n### Notes\n");
        for note in &output.report.notes {
            body.push_str(&format!("- {}\n", note));
        }
    }
    body.push_str(&format!("\n_Porter job {}_\n", job_id));
    body
}

/// Machine-readable record of one migration, written during `Reporting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Job the report belongs to
    pub job_id: JobId,
    /// Repository migrated
    pub repository: RepositoryRef,
    /// Source version, if known
    pub source_version: Option<u32>,
    /// Target version
    pub target_version: u32,
    /// One-line summary
    pub summary: String,
    /// Full engine output
    pub output: TransformOutput,
    /// When the report was written
    pub generated_at: DateTime<Utc>,
}

impl MigrationReport {
    /// Assemble a report for `job_id`.
    pub fn new(
        job_id: JobId,
        repository: RepositoryRef,
        request: &MigrationRequest,
        output: TransformOutput,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            repository,
            source_version: *request.source_version(),
            target_version: *request.target_version(),
            summary: summarize(&output),
            output,
            generated_at,
        }
    }

    /// Write the report as `<dir>/<job_id>.json`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// A `Workspace` failure if the file cannot be written.
    #[instrument(skip(self, dir), fields(job_id = %self.job_id))]
    pub async fn write(&self, dir: &Path) -> Result<PathBuf, MigrationError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| {
            MigrationError::new(FailureKind::Workspace, format!("cannot encode report: {}", e))
        })?;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            MigrationError::new(
                FailureKind::Workspace,
                format!("cannot create {}: {}", dir.display(), e),
            )
        })?;
        let path = dir.join(format!("{}.json", self.job_id));
        tokio::fs::write(&path, json).await.map_err(|e| {
            MigrationError::new(
                FailureKind::Workspace,
                format!("cannot write {}: {}", path.display(), e),
            )
        })?;
        debug!(path = %path.display(), "Wrote migration report");
        Ok(path)
    }
}
