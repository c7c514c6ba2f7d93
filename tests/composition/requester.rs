//! Ordering and inheritance through `Requester`.

use super::test_utils::{flaky, get, status};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use tower_requester::cache::{CacheLayer, MemoryLoadingCache};
use tower_requester::core::boxed;
use tower_requester::middleware::{BreakerAction, CircuitBreakerFn, CircuitBreakerLayer, HeaderLayer};
use tower_requester::retry::{BackoffKind, RetryLayer};
use tower_requester::{invoker_fn, BoxInvoker, HttpRequest, Middleware, Requester};

/// Records `name` when a request passes through on the way in.
fn recording(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Middleware {
    let log = Arc::clone(log);
    Middleware::from_fn(move |inner: BoxInvoker| {
        let log = Arc::clone(&log);
        boxed(invoker_fn(move |req: HttpRequest| {
            log.lock().unwrap().push(name);
            inner.clone().oneshot(req)
        }))
    })
}

fn fast_retry(attempts: usize) -> RetryLayer {
    RetryLayer::builder(attempts, Duration::from_millis(1))
        .backoff(BackoffKind::Constant)
        .jitter(0.0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn first_added_sees_request_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (transport, _calls) = flaky(0);

    let mut requester = Requester::new(transport);
    requester
        .use_middleware(recording("outer", &log))
        .use_middleware(recording("middle", &log))
        .use_middleware(recording("inner", &log));
    requester.call(get("/")).await.unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), &["outer", "middle", "inner"]);
}

#[tokio::test]
async fn with_adds_to_a_copy() {
    let (transport, calls) = flaky(1);
    let mut base = Requester::new(transport);
    base.use_layer(HeaderLayer::json());

    let retrying = base.with(fast_retry(3));
    assert_eq!(base.middlewares().len(), 1);
    assert_eq!(retrying.middlewares().len(), 2);

    let err = base.call(get("/a")).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let resp = retrying.call(get("/a")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cache_and_breaker_through_requester() {
    let executions = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&executions);
    let breaker = CircuitBreakerFn::new(move |action: BreakerAction| {
        e.fetch_add(1, Ordering::SeqCst);
        action
    });

    let upstream_calls = Arc::new(AtomicUsize::new(0));
    let u = Arc::clone(&upstream_calls);
    let transport = invoker_fn(move |_req: HttpRequest| {
        u.fetch_add(1, Ordering::SeqCst);
        async { Ok(status(200, "catalog")) }
    });

    let mut requester = Requester::new(transport);
    requester
        .use_layer(CacheLayer::builder().loading_cache(MemoryLoadingCache::new()).build())
        .use_layer(CircuitBreakerLayer::new(breaker));

    let service = requester.service();
    for _ in 0..3 {
        service.clone().oneshot(get("/catalog")).await.unwrap();
    }

    // Cache hits never reach the breaker.
    assert_eq!(executions.load(Ordering::SeqCst), 1);
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
}
