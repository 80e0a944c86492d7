//! Tests for the rate-limited client: retry bound, caching, quota waits and
//! cancellation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use porter_cache::{Fingerprint, ResultCache, ResultCacheConfig};
use porter_core::{CancelToken, Endpoint, ManualClock, Observed, QuotaObservation};
use porter_error::{ApiError, ApiErrorKind, FailureKind, ReportedQuota};
use porter_rate_limit::{
    Idempotency, ManualSleeper, RateLimitTracker, RateLimitedClient, TokioSleeper,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
}

struct Harness {
    clock: ManualClock,
    sleeper: ManualSleeper,
    client: RateLimitedClient,
    calls: Arc<AtomicU32>,
}

fn harness() -> Harness {
    let clock = ManualClock::new(start());
    let sleeper = ManualSleeper::new(clock.clone());
    let tracker = RateLimitTracker::new(2, std::time::Duration::from_secs(5))
        .with_clock(Arc::new(clock.clone()));
    let cache = ResultCache::with_clock(ResultCacheConfig::default(), Arc::new(clock.clone()));
    let client = RateLimitedClient::new(tracker, cache)
        .with_clock(Arc::new(clock.clone()))
        .with_sleeper(Arc::new(sleeper.clone()))
        .with_seed(7);
    Harness {
        clock,
        sleeper,
        client,
        calls: Arc::new(AtomicU32::new(0)),
    }
}

fn key() -> Fingerprint {
    Fingerprint::new("analysis", "github.com/org/repo")
}

#[tokio::test]
async fn test_transient_failures_stop_after_three_calls() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();

    let result: Result<String, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::network("connection reset"))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind, FailureKind::TransientNetwork);
    assert!(err.message.contains("gave up after 3 attempts"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);

    // Two backoff sleeps: ~1s and ~2s with 20% jitter.
    let sleeps = h.sleeper.sleeps().await;
    assert_eq!(sleeps.len(), 2);
    assert!(sleeps[0].as_secs_f64() >= 0.8 && sleeps[0].as_secs_f64() <= 1.2);
    assert!(sleeps[1].as_secs_f64() >= 1.6 && sleeps[1].as_secs_f64() <= 2.4);
}

#[tokio::test]
async fn test_quota_refusals_wait_for_reset_then_exhaust() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();
    let clock = h.clock.clone();

    let result: Result<String, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            let reset_at = clock_now(&clock) + Duration::seconds(60);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::rate_limited(Some(reset_at)))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind, FailureKind::QuotaExhausted);
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);

    // Each retry waits exactly until the embedded reset plus the margin.
    let sleeps = h.sleeper.sleeps().await;
    assert_eq!(sleeps, vec![std::time::Duration::from_secs(65); 2]);
}

#[tokio::test]
async fn test_secondary_limit_waits_for_its_own_reset() {
    let h = harness();
    let cancel = CancelToken::new();
    let hourly_reset = start() + Duration::seconds(3600);
    h.client
        .tracker()
        .update(
            Endpoint::Core,
            QuotaObservation {
                limit: 5000,
                remaining: 4000,
                reset_at: hourly_reset,
            },
        )
        .await;

    let calls = h.calls.clone();
    let clock = h.clock.clone();
    let value: String = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            let retry_at = clock_now(&clock) + Duration::seconds(60);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::rate_limited(Some(retry_at)))
                } else {
                    Ok(Observed::new(
                        "created".to_string(),
                        Some(QuotaObservation {
                            limit: 5000,
                            remaining: 3999,
                            reset_at: hourly_reset,
                        }),
                    ))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "created");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.sleeper.sleeps().await,
        vec![std::time::Duration::from_secs(65)]
    );

    let state = h.client.tracker().get(Endpoint::Core).await.unwrap();
    assert_eq!(state.remaining, 3999);
    assert_eq!(state.reset_at, hourly_reset);
    assert!(h.client.tracker().may_proceed(Endpoint::Core).await);
}

#[tokio::test]
async fn test_refusal_quota_reaches_tracker() {
    let h = harness();
    let cancel = CancelToken::new();
    let hourly_reset = start() + Duration::seconds(1800);

    let result: Result<String, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || async move {
            Err(ApiError::new(ApiErrorKind::Rejected {
                status: 403,
                message: "Resource not accessible by integration".into(),
            })
            .with_quota(ReportedQuota {
                limit: 60,
                remaining: 12,
                reset_at: hourly_reset,
            }))
        })
        .await;

    assert_eq!(result.unwrap_err().kind, FailureKind::PlatformRejected);
    let state = h.client.tracker().get(Endpoint::Core).await.unwrap();
    assert_eq!((state.limit, state.remaining), (60, 12));
    assert_eq!(state.reset_at, hourly_reset);
    assert!(!h.client.tracker().is_authenticated().await);
}

#[tokio::test]
async fn test_refusal_without_prior_success_learns_limit() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();
    let clock = h.clock.clone();
    let hourly_reset = start() + Duration::seconds(3600);

    let value: u32 = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            let retry_at = clock_now(&clock) + Duration::seconds(30);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::rate_limited(Some(retry_at)).with_quota(ReportedQuota {
                        limit: 5000,
                        remaining: 4200,
                        reset_at: hourly_reset,
                    }))
                } else {
                    Ok(Observed::bare(1))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 1);
    assert_eq!(
        h.sleeper.sleeps().await,
        vec![std::time::Duration::from_secs(35)]
    );
    // The refusal's own reset governs the wait; the limit comes from its headers.
    let state = h.client.tracker().get(Endpoint::Core).await.unwrap();
    assert_eq!(state.limit, 5000);
    assert_eq!(state.reset_at, start() + Duration::seconds(30));
    assert!(h.client.tracker().is_authenticated().await);
}

fn clock_now(clock: &ManualClock) -> DateTime<Utc> {
    use porter_core::Clock;
    clock.now()
}

#[tokio::test]
async fn test_quota_refusal_without_reset_uses_backoff() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();

    let result: Result<u32, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(ApiError::rate_limited(None))
                } else {
                    Ok(Observed::bare(7))
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 7);
    let sleeps = h.sleeper.sleeps().await;
    assert_eq!(sleeps.len(), 1);
    assert!(sleeps[0].as_secs_f64() <= 1.2);
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();

    let result: Result<String, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::new(ApiErrorKind::Server {
                        status: 502,
                        message: "Bad gateway".into(),
                    }))
                } else {
                    Ok(Observed::bare("ok".to_string()))
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();

    let result: Result<String, _> = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::new(ApiErrorKind::Rejected {
                    status: 404,
                    message: "Not Found".into(),
                }))
            }
        })
        .await;

    assert_eq!(result.unwrap_err().kind, FailureKind::PlatformRejected);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert!(h.sleeper.sleeps().await.is_empty());
}

#[tokio::test]
async fn test_cache_hit_skips_call_and_quota() {
    let h = harness();
    let cancel = CancelToken::new();
    let reset_at = start() + Duration::seconds(3600);

    for _ in 0..3 {
        let calls = h.calls.clone();
        let value: String = h
            .client
            .call(Endpoint::Core, Idempotency::Cached(key()), &cancel, || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Observed::new(
                        "main".to_string(),
                        Some(QuotaObservation {
                            limit: 5000,
                            remaining: 4999 - n,
                            reset_at,
                        }),
                    ))
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "main");
    }

    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    let state = h.client.tracker().get(Endpoint::Core).await.unwrap();
    assert_eq!(state.remaining, 4999);
}

#[tokio::test]
async fn test_expired_cache_entry_calls_again() {
    let h = harness();
    let cancel = CancelToken::new();

    for _ in 0..2 {
        let calls = h.calls.clone();
        let _: String = h
            .client
            .call(Endpoint::Core, Idempotency::Cached(key()), &cancel, || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Observed::bare("main".to_string()))
                }
            })
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(301));
    }

    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_bypasses_but_repopulates_cache() {
    let h = harness();
    let cancel = CancelToken::new();
    let calls = h.calls.clone();
    let op = || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(Observed::bare(n))
        }
    };

    let first: u32 = h
        .client
        .call(Endpoint::Core, Idempotency::read(key(), false), &cancel, op)
        .await
        .unwrap();
    let refreshed: u32 = h
        .client
        .call(Endpoint::Core, Idempotency::read(key(), true), &cancel, op)
        .await
        .unwrap();
    let cached: u32 = h
        .client
        .call(Endpoint::Core, Idempotency::read(key(), false), &cancel, op)
        .await
        .unwrap();

    assert_eq!((first, refreshed, cached), (0, 1, 1));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mutating_calls_are_never_cached() {
    let h = harness();
    let cancel = CancelToken::new();
    for _ in 0..2 {
        let calls = h.calls.clone();
        let _: String = h
            .client
            .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Observed::bare("pushed".to_string()))
                }
            })
            .await
            .unwrap();
    }
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert!(h.client.cache().lock().await.is_empty());
}

#[tokio::test]
async fn test_preflight_waits_for_reset_when_reserve_reached() {
    let h = harness();
    let cancel = CancelToken::new();
    h.client
        .tracker()
        .update(
            Endpoint::Core,
            QuotaObservation {
                limit: 5000,
                remaining: 1,
                reset_at: start() + Duration::seconds(600),
            },
        )
        .await;

    let calls = h.calls.clone();
    let _: String = h
        .client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Observed::bare("ok".to_string()))
            }
        })
        .await
        .unwrap();

    assert_eq!(
        h.sleeper.sleeps().await,
        vec![std::time::Duration::from_secs(605)]
    );
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_interrupts_quota_wait() {
    let clock = ManualClock::new(start());
    let tracker = RateLimitTracker::new(2, std::time::Duration::from_secs(5))
        .with_clock(Arc::new(clock.clone()));
    tracker
        .update(
            Endpoint::Core,
            QuotaObservation {
                limit: 5000,
                remaining: 0,
                reset_at: start() + Duration::seconds(3600),
            },
        )
        .await;
    let client = RateLimitedClient::new(tracker, ResultCache::default())
        .with_clock(Arc::new(clock))
        .with_sleeper(Arc::new(TokioSleeper));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let calls = Arc::new(AtomicU32::new(0));
    let counted = calls.clone();
    let result: Result<String, _> = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        client.call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Observed::bare("never".to_string()))
            }
        }),
    )
    .await
    .unwrap();

    assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_max_attempts_is_configurable() {
    let h = harness();
    let client = h.client.clone().with_max_attempts(5);
    let cancel = CancelToken::new();
    let calls = h.calls.clone();

    let _: Result<String, _> = client
        .call(Endpoint::Core, Idempotency::Mutating, &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::network("timeout"))
            }
        })
        .await;

    assert_eq!(h.calls.load(Ordering::SeqCst), 5);
}
