//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Maps an attempt number to a randomized delay.
///
/// `delay(n) = initial * 2^n * (1 ± jitter)`, never more than `max_delay`.
/// The policy itself holds no randomness; callers pass the random source,
/// so a seeded generator makes every delay reproducible.
///
/// # Example
///
/// ```
/// use porter_rate_limit::BackoffPolicy;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let policy = BackoffPolicy::default();
/// let mut rng = StdRng::seed_from_u64(7);
/// let delay = policy.delay_with(2, &mut rng);
/// assert!(delay.as_secs_f64() >= 3.2 && delay.as_secs_f64() <= 4.8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    initial: Duration,
    jitter: f64,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Create a policy. `jitter` is clamped into `[0, 1)`.
    pub fn new(initial: Duration, jitter: f64, max_delay: Duration) -> Self {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 0.999)
        } else {
            0.0
        };
        Self {
            initial,
            jitter,
            max_delay,
        }
    }

    /// Delay before the first retry.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Relative jitter.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Hard cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Un-jittered delay for attempt `n`, capped.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let secs = self.initial.as_secs_f64() * 2f64.powi(attempt.min(64) as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Jittered delay for attempt `n` (0-based), drawing from `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let factor = if self.jitter > 0.0 {
            1.0 + rng.gen_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        let secs = self.initial.as_secs_f64() * 2f64.powi(attempt.min(64) as i32) * factor;
        Duration::from_secs_f64(secs.clamp(0.0, self.max_delay.as_secs_f64()))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 0.2, Duration::from_secs(300))
    }
}
