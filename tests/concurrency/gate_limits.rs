//! Admission limit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::{Layer, ServiceExt};
use tower_requester::concurrency::MaxConcurrentLayer;
use tower_requester::{invoker_fn, Body, HttpRequest, HttpResponse, Invoker};

fn get() -> HttpRequest {
    http::Request::get("http://example.com/").body(Body::empty()).unwrap()
}

/// Tracks how many calls are inside at once. Calls block until `release`
/// is notified.
#[derive(Clone, Default)]
struct Tracker {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    release: Arc<Notify>,
}

impl Tracker {
    fn invoker(&self) -> impl Invoker {
        let tracker = self.clone();
        invoker_fn(move |_req: HttpRequest| {
            let tracker = tracker.clone();
            async move {
                let now = tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
                tracker.peak.fetch_max(now, Ordering::SeqCst);
                tracker.release.notified().await;
                tracker.active.fetch_sub(1, Ordering::SeqCst);
                tracker.completed.fetch_add(1, Ordering::SeqCst);
                Ok(HttpResponse::new(Body::empty()))
            }
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_than_capacity_and_all_complete() {
    let tracker = Tracker::default();
    let layer = MaxConcurrentLayer::builder().max_concurrent(3).build().unwrap();
    let svc = layer.layer(tracker.invoker());

    let mut handles = Vec::new();
    for _ in 0..12 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move { svc.oneshot(get()).await }));
    }

    // Keep releasing blocked calls until every one of them has finished.
    while tracker.completed.load(Ordering::SeqCst) < 12 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(tracker.active.load(Ordering::SeqCst) <= 3);
        assert!(layer.in_flight() <= 3);
        tracker.release.notify_waiters();
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(tracker.peak.load(Ordering::SeqCst), 3);
    assert_eq!(layer.in_flight(), 0);
}

#[tokio::test]
async fn services_from_one_layer_share_slots() {
    let tracker = Tracker::default();
    let layer = MaxConcurrentLayer::builder().max_concurrent(1).build().unwrap();
    let first = layer.layer(tracker.invoker());
    let second = layer.layer(tracker.invoker());

    let a = tokio::spawn(first.oneshot(get()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let b = tokio::spawn(second.oneshot(get()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(tracker.active.load(Ordering::SeqCst), 1);
    assert_eq!(layer.in_flight(), 1);

    while tracker.completed.load(Ordering::SeqCst) < 2 {
        tracker.release.notify_waiters();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_calls_release_their_slot() {
    let layer = MaxConcurrentLayer::builder().max_concurrent(1).build().unwrap();
    let svc = layer.layer(invoker_fn(|_req: HttpRequest| async {
        Err::<HttpResponse, _>(tower_requester::Error::transport("boom"))
    }));

    for _ in 0..3 {
        svc.clone().oneshot(get()).await.unwrap_err();
    }
    assert_eq!(layer.in_flight(), 0);
}
