//! Several decorators over one transport.

use super::test_utils::{flaky, get, status};
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{ServiceBuilder, ServiceExt};
use tower_requester::cache::{CacheLayer, MemoryLoadingCache};
use tower_requester::concurrency::MaxConcurrentLayer;
use tower_requester::core::RequestExt;
use tower_requester::middleware::{HeaderLayer, LoggerLayer};
use tower_requester::retry::{BackoffKind, RetryLayer};
use tower_requester::{invoker_fn, Body, Cancellation, HttpRequest};
use tracing_test::traced_test;

fn fast_retry(attempts: usize) -> RetryLayer {
    RetryLayer::builder(attempts, Duration::from_millis(1))
        .backoff(BackoffKind::Constant)
        .jitter(0.0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn cache_outside_retry_stores_recovered_response() {
    let (inner, calls) = flaky(1);
    let cache = MemoryLoadingCache::new();
    let svc = ServiceBuilder::new()
        .layer(CacheLayer::builder().loading_cache(cache.clone()).build())
        .layer(fast_retry(3))
        .service(inner);

    svc.clone().oneshot(get("/price")).await.unwrap();
    svc.clone().oneshot(get("/price")).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn retry_outside_gate_releases_slot_between_attempts() {
    let (inner, calls) = flaky(2);
    let gate = MaxConcurrentLayer::builder().max_concurrent(1).build().unwrap();
    let svc = ServiceBuilder::new()
        .layer(fast_retry(3))
        .layer(gate.clone())
        .service(inner);

    let resp = svc.oneshot(get("/slot")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(gate.in_flight(), 0);
}

#[tokio::test]
async fn headers_reach_every_retry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&attempts);
    let inner = invoker_fn(move |req: HttpRequest| {
        let auth = req
            .headers()
            .get("authorization")
            .map(|v| v.to_str().unwrap().to_string());
        s.lock().unwrap().push(auth);
        let n = a.fetch_add(1, Ordering::SeqCst);
        async move { Ok(status(if n == 0 { 503 } else { 200 }, "")) }
    });

    let svc = ServiceBuilder::new()
        .layer(HeaderLayer::basic_auth("user", "passwd").unwrap())
        .layer(fast_retry(3))
        .service(inner);
    svc.oneshot(get("/secure")).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen
        .iter()
        .all(|v| v.as_deref() == Some("Basic dXNlcjpwYXNzd2Q=")));
}

#[tokio::test]
#[traced_test]
async fn logger_sees_body_and_retry_replays_it() {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let b = Arc::clone(&bodies);
    let inner = invoker_fn(move |req: HttpRequest| {
        let b = Arc::clone(&b);
        async move {
            let body = req.into_body().collect().await.unwrap().to_bytes();
            let mut bodies = b.lock().unwrap();
            bodies.push(body);
            let code = if bodies.len() < 2 { 500 } else { 200 };
            Ok(status(code, "done"))
        }
    });

    let svc = ServiceBuilder::new()
        .layer(LoggerLayer::new().prefix("orders").with_body(true))
        .layer(fast_retry(3))
        .service(inner);

    let mut req = http::Request::post("http://example.com/orders")
        .body(Body::empty())
        .unwrap();
    req.set_replayable_body("{\"sku\":42}");
    let resp = svc.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(bodies.lock().unwrap().as_slice(), &["{\"sku\":42}", "{\"sku\":42}"]);
    assert!(logs_contain("orders"));
    assert!(logs_contain("sku"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retry_behind_gate() {
    let (inner, calls) = flaky(usize::MAX);
    let svc = ServiceBuilder::new()
        .layer(
            RetryLayer::builder(10, Duration::from_secs(1))
                .backoff(BackoffKind::Constant)
                .jitter(0.0)
                .build()
                .unwrap(),
        )
        .layer(MaxConcurrentLayer::builder().max_concurrent(2).build().unwrap())
        .service(inner);

    let mut req = get("/slow");
    req.extensions_mut()
        .insert(Cancellation::new().timeout(Duration::from_millis(2500)));

    let err = svc.oneshot(req).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
