//! Transformation engine run as an external process.

use async_trait::async_trait;
use porter_core::{Directive, TransformOutput};
use porter_error::{FailureKind, MigrationError};
use porter_interface::TransformationEngine;
use porter_rate_limit::EngineSettings;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

/// Runs `<command> <args...> <checkout> <directive...>` and reads a JSON
/// [`TransformOutput`] from its standard output.
///
/// A non-zero exit is a `TransformationFailure` carrying the non-empty lines
/// of standard error as diagnostics.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
}

impl ProcessEngine {
    /// Create an engine running `command` with leading `args`.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Create an engine from the `[engine]` configuration section.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.command.clone(), settings.args.clone())
    }

    /// The executable.
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl TransformationEngine for ProcessEngine {
    #[instrument(skip(self, directives), fields(command = %self.command, checkout = %checkout.display(), directives = directives.len()))]
    async fn transform(
        &self,
        checkout: &Path,
        directives: &[Directive],
    ) -> Result<TransformOutput, MigrationError> {
        debug!("Running transformation engine");
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(checkout)
            .args(directives.iter().map(|d| d.as_str()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to spawn transformation engine");
                MigrationError::new(
                    FailureKind::TransformationFailure,
                    format!("cannot run {}: {}", self.command, e),
                )
            })?;

        if !output.status.success() {
            let diagnostics: Vec<String> = String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            error!(status = %output.status, diagnostics = diagnostics.len(), "Transformation engine failed");
            return Err(MigrationError::new(
                FailureKind::TransformationFailure,
                format!("{} exited with {}", self.command, output.status),
            )
            .with_diagnostics(diagnostics));
        }

        let result: TransformOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            MigrationError::new(
                FailureKind::TransformationFailure,
                format!("unreadable engine output: {}", e),
            )
        })?;
        info!(
            files = result.change_set.len(),
            issues_fixed = result.report.issues_fixed,
            "Transformation finished"
        );
        Ok(result)
    }
}
