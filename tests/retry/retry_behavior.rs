//! Attempt budget, exhaustion and status policy tests.

use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_requester::retry::{BackoffKind, RetryEvent, RetryLayer};
use tower_requester::{invoker_fn, Body, Error, HttpRequest, HttpResponse, Invoker};

fn get() -> HttpRequest {
    http::Request::get("http://example.com/orders")
        .body(Body::empty())
        .unwrap()
}

fn status(code: u16) -> HttpResponse {
    let mut resp = HttpResponse::new(Body::empty());
    *resp.status_mut() = StatusCode::from_u16(code).unwrap();
    resp
}

/// Transport that always fails with a connection error.
fn failing() -> (impl Invoker, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let svc = invoker_fn(move |_req: HttpRequest| {
        let n = c.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Err(Error::transport(format!("connection refused #{n}"))) }
    });
    (svc, calls)
}

/// Transport that always answers with `code`.
fn answering(code: u16) -> (impl Invoker, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let svc = invoker_fn(move |_req: HttpRequest| {
        c.fetch_add(1, Ordering::SeqCst);
        async move { Ok(status(code)) }
    });
    (svc, calls)
}

fn fast(attempts: usize) -> tower_requester::retry::RetryConfigBuilder {
    RetryLayer::builder(attempts, Duration::from_millis(1))
        .backoff(BackoffKind::Constant)
        .jitter(0.0)
}

#[tokio::test]
async fn transport_errors_use_the_whole_budget() {
    for attempts in 1..=4 {
        let (inner, calls) = failing();
        let svc = fast(attempts).build().unwrap().layer(inner);

        let err = svc.oneshot(get()).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), attempts);
        match &err {
            Error::RetryExhausted { attempts: a, source } => {
                assert_eq!(*a, attempts);
                assert_eq!(
                    source.to_string(),
                    format!("transport error: connection refused #{attempts}")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn retryable_status_returns_last_response() {
    let (inner, calls) = answering(503);
    let svc = fast(3).build().unwrap().layer(inner);

    let resp = svc.oneshot(get()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried_by_default() {
    let (inner, calls) = answering(404);
    let svc = fast(3).build().unwrap().layer(inner);

    let resp = svc.oneshot(get()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn allow_list_retries_only_listed_statuses() {
    let (inner, calls) = answering(429);
    let svc = fast(4)
        .retry_on_statuses([StatusCode::TOO_MANY_REQUESTS])
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let (inner, calls) = answering(500);
    let svc = fast(4)
        .retry_on_statuses([StatusCode::TOO_MANY_REQUESTS])
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deny_list_retries_everything_else() {
    let (inner, calls) = answering(501);
    let svc = fast(4)
        .retry_except_statuses([StatusCode::NOT_IMPLEMENTED])
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (inner, calls) = answering(418);
    let svc = fast(4)
        .retry_except_statuses([StatusCode::NOT_IMPLEMENTED])
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn recovers_after_two_failures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let inner = invoker_fn(move |_req: HttpRequest| {
        let n = c.fetch_add(1, Ordering::SeqCst);
        async move {
            match n {
                0 => Err(Error::transport("connection reset")),
                1 => Ok(status(502)),
                _ => Ok(status(200)),
            }
        }
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&events);
    let svc = fast(5)
        .on_event(move |event| {
            let label = match event {
                RetryEvent::Retry { attempt, .. } => format!("retry:{attempt}"),
                RetryEvent::Success { attempts, .. } => format!("success:{attempts}"),
                RetryEvent::RetryableStatus { status, .. } => format!("status:{}", status.as_u16()),
                RetryEvent::Exhausted { attempts, .. } => format!("exhausted:{attempts}"),
                other => format!("{other:?}"),
            };
            e.lock().unwrap().push(label);
        })
        .build()
        .unwrap()
        .layer(inner);

    let resp = svc.oneshot(get()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let events = events.lock().unwrap();
    assert!(events.contains(&"success:3".to_string()));
    assert!(events.contains(&"status:502".to_string()));
    assert!(!events.iter().any(|e| e.starts_with("exhausted")));
}

#[tokio::test]
async fn exhausted_and_success_callbacks() {
    let exhausted = Arc::new(AtomicUsize::new(0));
    let x = Arc::clone(&exhausted);
    let (inner, _calls) = failing();
    let svc = fast(2)
        .on_exhausted(move |attempts| {
            x.store(attempts, Ordering::SeqCst);
        })
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap_err();
    assert_eq!(exhausted.load(Ordering::SeqCst), 2);

    let succeeded = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&succeeded);
    let (inner, _calls) = answering(200);
    let svc = fast(2)
        .on_success(move |attempts| {
            s.store(attempts, Ordering::SeqCst);
        })
        .build()
        .unwrap()
        .layer(inner);
    svc.oneshot(get()).await.unwrap();
    assert_eq!(succeeded.load(Ordering::SeqCst), 1);
}
