//! Cancellation while waiting for a slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::{Layer, ServiceExt};
use tower_requester::concurrency::MaxConcurrentLayer;
use tower_requester::core::CancelReason;
use tower_requester::{invoker_fn, Body, Cancellation, HttpRequest, HttpResponse};

fn get() -> HttpRequest {
    http::Request::get("http://example.com/").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn waiter_cancelled_before_admission_never_calls_inner() {
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let c = Arc::clone(&calls);
    let r = Arc::clone(&release);
    let layer = MaxConcurrentLayer::builder().max_concurrent(1).build().unwrap();
    let svc = layer.layer(invoker_fn(move |_req: HttpRequest| {
        c.fetch_add(1, Ordering::SeqCst);
        let r = Arc::clone(&r);
        async move {
            r.notified().await;
            Ok(HttpResponse::new(Body::empty()))
        }
    }));

    let holder = tokio::spawn(svc.clone().oneshot(get()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let cancellation = Cancellation::new();
    let mut req = get();
    req.extensions_mut().insert(cancellation.clone());
    let waiter = tokio::spawn(svc.clone().oneshot(req));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancellation.cancel();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.cancel_reason(), Some(CancelReason::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    release.notify_waiters();
    holder.await.unwrap().unwrap();
    assert_eq!(layer.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_expires_while_waiting() {
    let release = Arc::new(Notify::new());
    let r = Arc::clone(&release);
    let layer = MaxConcurrentLayer::builder().max_concurrent(1).build().unwrap();
    let svc = layer.layer(invoker_fn(move |_req: HttpRequest| {
        let r = Arc::clone(&r);
        async move {
            r.notified().await;
            Ok(HttpResponse::new(Body::empty()))
        }
    }));

    let holder = tokio::spawn(svc.clone().oneshot(get()));
    tokio::task::yield_now().await;

    let mut req = get();
    req.extensions_mut()
        .insert(Cancellation::new().timeout(Duration::from_millis(50)));
    let err = svc.clone().oneshot(req).await.unwrap_err();

    assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));

    release.notify_waiters();
    holder.await.unwrap().unwrap();
}
