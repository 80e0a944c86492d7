//! Pluggable sleep primitive.

use async_trait::async_trait;
use porter_core::ManualClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Suspends the current task.
///
/// The rate-limited client sleeps only through this trait, so tests can
/// observe every requested wait without spending wall time.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps and advances a [`ManualClock`] instead of
/// waiting.
#[derive(Debug, Clone)]
pub struct ManualSleeper {
    clock: ManualClock,
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl ManualSleeper {
    /// Create a sleeper driving `clock`.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            slept: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every sleep requested so far, in order.
    pub async fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().await.clone()
    }

    /// Sum of every sleep requested so far.
    pub async fn total(&self) -> Duration {
        self.slept.lock().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for ManualSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().await.push(duration);
        let by = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        self.clock.advance(by);
        tokio::task::yield_now().await;
    }
}
