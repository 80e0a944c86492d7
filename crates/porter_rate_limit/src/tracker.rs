//! Per-endpoint quota tracking.

use chrono::{DateTime, Utc};
use porter_core::{Clock, Endpoint, QuotaObservation, QuotaState, SystemClock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// GitHub's authenticated `core` limit.
const AUTHENTICATED_CORE_LIMIT: u32 = 5000;

/// GitHub's authenticated `search` limit.
const AUTHENTICATED_SEARCH_LIMIT: u32 = 30;

/// Shared quota state for every endpoint category.
///
/// One tracker is constructed per process and cloned into every job task;
/// clones share the same state. The freshest observation wins: a response
/// from an older window is ignored, and any response from the current or a
/// later window overwrites the stored state.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use porter_core::{Endpoint, ManualClock, QuotaObservation};
/// use porter_rate_limit::RateLimitTracker;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let now = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
/// let tracker = RateLimitTracker::new(2, std::time::Duration::from_secs(5))
///     .with_clock(Arc::new(ManualClock::new(now)));
///
/// tracker
///     .update(Endpoint::Core, QuotaObservation {
///         limit: 5000,
///         remaining: 1,
///         reset_at: now + Duration::seconds(60),
///     })
///     .await;
///
/// assert!(!tracker.may_proceed(Endpoint::Core).await);
/// assert_eq!(tracker.wait_duration(Endpoint::Core).await.as_secs(), 65);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitTracker {
    states: Arc<RwLock<HashMap<Endpoint, QuotaState>>>,
    clock: Arc<dyn Clock>,
    reserve_threshold: u32,
    safety_margin: Duration,
    announced_authenticated: Arc<AtomicBool>,
}

impl RateLimitTracker {
    /// Create a tracker on the system clock.
    pub fn new(reserve_threshold: u32, safety_margin: Duration) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(SystemClock),
            reserve_threshold,
            safety_margin,
            announced_authenticated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Judge windows against `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Safety margin added to every wait.
    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// Apply a fresh observation.
    ///
    /// Observations whose `remaining` exceeds `limit` are malformed and
    /// dropped. An observation from an older window than the stored one is
    /// stale and dropped; anything else replaces the stored state, including
    /// a short refusal window recorded by [`Self::mark_exhausted`].
    #[instrument(skip(self, observation), fields(endpoint = %endpoint, remaining = observation.remaining, limit = observation.limit))]
    pub async fn update(&self, endpoint: Endpoint, observation: QuotaObservation) {
        if observation.limit == 0 || observation.remaining > observation.limit {
            warn!("Ignoring malformed quota observation");
            return;
        }

        let authenticated = match endpoint {
            Endpoint::Core => observation.limit >= AUTHENTICATED_CORE_LIMIT,
            Endpoint::Search => observation.limit >= AUTHENTICATED_SEARCH_LIMIT,
            Endpoint::Graphql => true,
        };

        let mut states = self.states.write().await;
        if let Some(current) = states.get(&endpoint)
            && observation.reset_at < current.reset_at
        {
            debug!("Ignoring observation from an older window");
            return;
        }
        let next = QuotaState {
            limit: observation.limit,
            remaining: observation.remaining,
            reset_at: observation.reset_at,
            authenticated,
        };
        debug!(remaining = next.remaining, reset_at = %next.reset_at, "Updated quota state");
        states.insert(endpoint, next);
        drop(states);

        if endpoint == Endpoint::Core
            && authenticated
            && !self.announced_authenticated.swap(true, Ordering::SeqCst)
        {
            info!(limit = observation.limit, "Authenticated quota tier detected");
        }
    }

    /// Record that the platform refused a call for quota until `reset_at`.
    ///
    /// The refusal's own reset time replaces the stored one, so a short
    /// secondary limit (`retry-after: 60`) blocks the endpoint for a minute,
    /// not until the end of the hourly window.
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    pub async fn mark_exhausted(&self, endpoint: Endpoint, reset_at: DateTime<Utc>) {
        let mut states = self.states.write().await;
        let state = states.entry(endpoint).or_insert_with(|| QuotaState {
            limit: 0,
            remaining: 0,
            reset_at,
            authenticated: false,
        });
        state.remaining = 0;
        state.reset_at = reset_at;
        warn!(reset_at = %state.reset_at, "Quota exhausted");
    }

    /// Whether a call against `endpoint` may go out now.
    ///
    /// False iff fewer than `reserve_threshold` calls remain and the window
    /// has not reset yet. Unobserved endpoints may always proceed.
    pub async fn may_proceed(&self, endpoint: Endpoint) -> bool {
        let now = self.clock.now();
        let states = self.states.read().await;
        match states.get(&endpoint) {
            Some(state) => !(state.remaining < self.reserve_threshold && now < state.reset_at),
            None => true,
        }
    }

    /// How long a caller must wait before calling `endpoint`.
    ///
    /// `max(0, reset_at - now) + safety_margin` when the endpoint may not
    /// proceed; zero otherwise.
    pub async fn wait_duration(&self, endpoint: Endpoint) -> Duration {
        let now = self.clock.now();
        let states = self.states.read().await;
        match states.get(&endpoint) {
            Some(state) if state.remaining < self.reserve_threshold && now < state.reset_at => {
                until(state.reset_at, now) + self.safety_margin
            }
            _ => Duration::ZERO,
        }
    }

    /// Quota state of one endpoint.
    pub async fn get(&self, endpoint: Endpoint) -> Option<QuotaState> {
        self.states.read().await.get(&endpoint).cloned()
    }

    /// Copy of every tracked endpoint.
    pub async fn snapshot(&self) -> BTreeMap<Endpoint, QuotaState> {
        self.states
            .read()
            .await
            .iter()
            .map(|(endpoint, state)| (*endpoint, state.clone()))
            .collect()
    }

    /// Whether the `core` credential tier is authenticated.
    pub async fn is_authenticated(&self) -> bool {
        self.get(Endpoint::Core)
            .await
            .is_some_and(|state| state.authenticated)
    }

    /// One-line summary, e.g. `CORE: 4990/5000 (reset: 12:30:00 UTC) | SEARCH: 30/30 (reset: 12:01:00 UTC)`.
    pub async fn status_line(&self) -> String {
        let snapshot = self.snapshot().await;
        if snapshot.is_empty() {
            return "no quota observed yet".to_string();
        }
        snapshot
            .iter()
            .map(|(endpoint, state)| {
                format!(
                    "{}: {}/{} (reset: {})",
                    endpoint.to_string().to_uppercase(),
                    state.remaining,
                    state.limit,
                    state.reset_at.format("%H:%M:%S UTC")
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Non-negative duration from `now` until `then`.
pub(crate) fn until(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (then - now).to_std().unwrap_or(Duration::ZERO)
}
