//! Log-based notifier.

use async_trait::async_trait;
use porter_error::MigrationError;
use porter_interface::{Notice, Notifier};
use tracing::info;

/// Writes every notice to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), MigrationError> {
        info!(
            job_id = %notice.job_id,
            recipient = %notice.recipient,
            repository = %notice.repository,
            change_request = ?notice.change_request_url,
            summary = %notice.summary,
            "Migration finished"
        );
        Ok(())
    }
}
