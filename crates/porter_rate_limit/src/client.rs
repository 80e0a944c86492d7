//! The rate-limited platform client.
//!
//! Every call to an external platform goes through
//! [`RateLimitedClient::call`], which composes the quota tracker, the result
//! cache, the backoff policy and an optional client-side smoothing limiter
//! around a caller-supplied operation.

use crate::{BackoffPolicy, PorterConfig, RateLimitTracker, Sleeper, TokioSleeper};
use crate::tracker::until;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use porter_cache::{Fingerprint, ResultCache};
use porter_core::{CancelToken, Clock, Endpoint, Observed, SystemClock};
use porter_error::{ApiError, MigrationError, RetryableError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

// Type alias for our direct rate limiter
type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Whether a call may be answered from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Idempotency {
    /// Read-only: answer from the cache when fresh, populate it on success.
    Cached(Fingerprint),
    /// Read-only, but skip the lookup; still populate the cache.
    Refresh(Fingerprint),
    /// Mutating: never cached.
    Mutating,
}

impl Idempotency {
    /// Cached read, or a forced refresh when `force_refresh` is set.
    pub fn read(key: Fingerprint, force_refresh: bool) -> Self {
        if force_refresh {
            Idempotency::Refresh(key)
        } else {
            Idempotency::Cached(key)
        }
    }

    fn key(&self) -> Option<&Fingerprint> {
        match self {
            Idempotency::Cached(key) | Idempotency::Refresh(key) => Some(key),
            Idempotency::Mutating => None,
        }
    }
}

/// The only component that talks to an external platform.
///
/// Cloning is cheap; clones share the tracker, the cache, the smoothing
/// limiter and the random source.
///
/// # Guarantees
///
/// - At most `max_attempts` (default 3) physical calls per logical call.
/// - A fresh cached result is returned without a call and without spending
///   quota.
/// - Callers see a quota refusal only once retries are exhausted, classified
///   as `QuotaExhausted`.
/// - Every sleep is interrupted by the job's cancel token.
///
/// # Example
///
/// ```rust,ignore
/// let metadata = client
///     .call(Endpoint::Core, Idempotency::Cached(key), &cancel, || {
///         platform.get_repository(&repository, &token)
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct RateLimitedClient {
    tracker: RateLimitTracker,
    cache: Arc<Mutex<ResultCache>>,
    backoff: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    throttle: Option<Arc<DirectRateLimiter>>,
    rng: Arc<Mutex<StdRng>>,
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("tracker", &self.tracker)
            .field("backoff", &self.backoff)
            .field("max_attempts", &self.max_attempts)
            .field("throttled", &self.throttle.is_some())
            .finish_non_exhaustive()
    }
}

impl RateLimitedClient {
    /// Create a client with default backoff, a 3-attempt cap, the tokio
    /// sleeper and the system clock.
    pub fn new(tracker: RateLimitTracker, cache: ResultCache) -> Self {
        Self {
            tracker,
            cache: Arc::new(Mutex::new(cache)),
            backoff: BackoffPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
            max_attempts: 3,
            throttle: None,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Build the client, tracker and cache described by `config`.
    pub fn from_config(config: &PorterConfig, clock: Arc<dyn Clock>) -> Self {
        let settings = &config.rate_limit;
        let tracker = RateLimitTracker::new(*settings.reserve_threshold(), settings.safety_margin())
            .with_clock(clock.clone());
        let cache = ResultCache::with_clock(config.cache.clone(), clock.clone());
        Self::new(tracker, cache)
            .with_clock(clock)
            .with_backoff(config.backoff.policy())
            .with_max_attempts(*settings.max_attempts())
            .with_requests_per_second(*settings.requests_per_second())
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the sleep primitive.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used for reset-based waits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cap physical calls per logical call. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Seed the jitter source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    /// Smooth physical calls to at most `rps` per second; 0 disables it.
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.throttle = NonZeroU32::new(rps)
            .map(|rps| Arc::new(GovernorRateLimiter::direct(Quota::per_second(rps))));
        self
    }

    /// Shared quota tracker.
    pub fn tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    /// Shared result cache.
    pub fn cache(&self) -> &Arc<Mutex<ResultCache>> {
        &self.cache
    }

    /// Retry cap.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` under quota tracking, caching and bounded retry.
    ///
    /// # Errors
    ///
    /// - `Cancelled` if `cancel` fires during any wait.
    /// - `QuotaExhausted` or `TransientNetwork` once `max_attempts` physical
    ///   calls have failed retryably.
    /// - The classified kind of the first non-retryable failure.
    #[instrument(skip(self, idempotency, cancel, operation), fields(endpoint = %endpoint, key = ?idempotency.key().map(|k| k.as_str())))]
    pub async fn call<T, F, Fut>(
        &self,
        endpoint: Endpoint,
        idempotency: Idempotency,
        cancel: &CancelToken,
        mut operation: F,
    ) -> Result<T, MigrationError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observed<T>, ApiError>>,
    {
        if let Idempotency::Cached(key) = &idempotency
            && let Some(value) = self.cache.lock().await.get(key)
        {
            match serde_json::from_value::<T>(value) {
                Ok(payload) => {
                    debug!("Answered from cache");
                    return Ok(payload);
                }
                Err(e) => warn!(error = %e, "Discarding undecodable cache entry"),
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            if !self.tracker.may_proceed(endpoint).await {
                let wait = self.tracker.wait_duration(endpoint).await;
                info!(wait_secs = wait.as_secs_f64(), "Quota reserve reached, waiting for reset");
                self.pause(wait, cancel).await?;
            }
            if cancel.is_cancelled() {
                return Err(MigrationError::cancelled());
            }
            if let Some(throttle) = &self.throttle {
                tokio::select! {
                    _ = throttle.until_ready() => {}
                    _ = cancel.cancelled() => return Err(MigrationError::cancelled()),
                }
            }

            debug!(attempt, max_attempts = self.max_attempts, "Calling platform");
            match operation().await {
                Ok(observed) => {
                    if let Some(quota) = observed.quota {
                        self.tracker.update(endpoint, quota).await;
                    }
                    if let Some(key) = idempotency.key() {
                        match serde_json::to_value(&observed.payload) {
                            Ok(value) => self.cache.lock().await.put(key.clone(), value, None),
                            Err(e) => warn!(error = %e, "Result not cacheable"),
                        }
                    }
                    return Ok(observed.payload);
                }
                Err(err) => {
                    if let Some(quota) = err.quota() {
                        self.tracker.update(endpoint, quota.into()).await;
                    }
                    if !err.is_retryable() {
                        warn!(error = %err, "Permanent error, failing immediately");
                        return Err(err.into());
                    }
                    if attempt >= self.max_attempts {
                        error!(error = %err, attempts = attempt, "Retries exhausted");
                        return Err(MigrationError::from(err)
                            .with_guidance(format!("gave up after {} attempts", attempt)));
                    }
                    let delay = self.retry_delay(endpoint, attempt, &err).await;
                    warn!(
                        error = %err,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        "Transient error, will retry"
                    );
                    self.pause(delay, cancel).await?;
                }
            }
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`.
    async fn retry_delay(&self, endpoint: Endpoint, attempt: u32, err: &ApiError) -> Duration {
        if err.is_quota_exceeded()
            && let Some(reset_at) = err.reset_at()
        {
            self.tracker.mark_exhausted(endpoint, reset_at).await;
            return until(reset_at, self.clock.now()) + self.tracker.safety_margin();
        }
        let mut rng = self.rng.lock().await;
        self.backoff.delay_with(attempt - 1, &mut *rng)
    }

    /// Sleep unless cancelled first.
    async fn pause(&self, duration: Duration, cancel: &CancelToken) -> Result<(), MigrationError> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.sleeper.sleep(duration) => Ok(()),
            _ = cancel.cancelled() => {
                info!("Wait interrupted by cancellation");
                Err(MigrationError::cancelled())
            }
        }
    }
}
