//! Retry over a flaky transport.

use super::test_utils::{flaky, get};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tower::{Layer, ServiceExt};
use tower_requester::retry::{Backoff, BackoffKind, RetryLayer, DEFAULT_JITTER};

#[tokio::test]
async fn fails_twice_then_succeeds() {
    let (inner, calls) = flaky(2);
    let initial = Duration::from_millis(1);
    let svc = RetryLayer::builder(3, initial).build().unwrap().layer(inner);

    let start = Instant::now();
    let resp = svc.oneshot(get("/checkout")).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(resp.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Smallest possible sum of the first two jittered delays.
    let schedule = Backoff::new(BackoffKind::Exponential, initial);
    let floor: Duration = (1..=2)
        .map(|k| schedule.base_delay(k).mul_f64(1.0 - DEFAULT_JITTER / 2.0))
        .sum();
    assert!(elapsed >= floor, "elapsed {elapsed:?} < {floor:?}");
}

#[tokio::test]
async fn budget_smaller_than_failures_exhausts() {
    let (inner, calls) = flaky(5);
    let svc = RetryLayer::builder(3, Duration::from_millis(1))
        .build()
        .unwrap()
        .layer(inner);

    let err = svc.oneshot(get("/checkout")).await.unwrap_err();

    assert!(err.is_retry_exhausted());
    assert_eq!(
        err.to_string(),
        "retry: transport error after 3 attempts: transport error: connection reset #3"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
