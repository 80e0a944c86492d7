//! Tests for the cancellation token.

use porter_core::CancelToken;
use std::time::Duration;

#[tokio::test]
async fn test_cancel_wakes_waiter() {
    let token = CancelToken::new();
    let waiter = token.clone();
    let handle = tokio::spawn(async move {
        waiter.cancelled().await;
        true
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!token.is_cancelled());
    token.cancel();

    let woke = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(woke);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_long_sleep() {
    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let interrupted = tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(Duration::from_secs(3600)) => false,
    };
    assert!(interrupted);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let token = CancelToken::default();
    token.cancel();
    token.cancel();
    token.cancelled().await;
    assert!(token.is_cancelled());
}
