//! Job-scoped working directories.

use porter_core::JobId;
use porter_error::{FailureKind, MigrationError};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Working directory owned by exactly one job, `<root>/<job_id>`.
///
/// The directory is created fresh; an existing directory for the same job is
/// never reused.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    /// Create `<workspace_root>/<job_id>`.
    ///
    /// # Errors
    ///
    /// A `Workspace` failure if the directory already exists or cannot be
    /// created.
    #[instrument(skip(workspace_root), fields(job_id = %job_id))]
    pub async fn prepare(workspace_root: &Path, job_id: JobId) -> Result<Self, MigrationError> {
        tokio::fs::create_dir_all(workspace_root)
            .await
            .map_err(|e| workspace_error(workspace_root, e))?;

        let root = workspace_root.join(job_id.to_string());
        tokio::fs::create_dir(&root)
            .await
            .map_err(|e| workspace_error(&root, e))?;
        debug!(path = %root.display(), "Prepared job workspace");
        Ok(Self { root })
    }

    /// The job directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the repository is checked out.
    pub fn checkout(&self) -> PathBuf {
        self.root.join("checkout")
    }

    /// Remove the job directory and everything in it.
    pub async fn remove(&self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(path = %self.root.display(), "Removed job workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.root.display(), error = %e, "Failed to remove job workspace"),
        }
    }
}

fn workspace_error(path: &Path, err: std::io::Error) -> MigrationError {
    MigrationError::new(
        FailureKind::Workspace,
        format!("cannot prepare {}: {}", path.display(), err),
    )
}
