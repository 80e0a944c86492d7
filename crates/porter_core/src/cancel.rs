//! Job-level cancellation signal.

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation flag shared between a job task and its caller.
///
/// Waiting code races [`CancelToken::cancelled`] against its own work in a
/// `tokio::select!`, so a cancel interrupts long sleeps immediately.
///
/// # Examples
///
/// ```
/// use porter_core::CancelToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let token = CancelToken::new();
/// let waiter = token.clone();
/// token.cancel();
/// waiter.cancelled().await;
/// assert!(waiter.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation has been signalled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped; no cancel can arrive anymore.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
