//! Body replay tests.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_requester::core::{RequestExt, Rewind};
use tower_requester::retry::{BackoffKind, RetryConfigBuilder, RetryLayer};
use tower_requester::{invoker_fn, Body, HttpRequest, HttpResponse, Invoker};

fn post(body: Body) -> HttpRequest {
    http::Request::post("http://example.com/upload")
        .header("content-type", "text/plain")
        .body(body)
        .unwrap()
}

fn stream_body(chunks: &[&'static str]) -> Body {
    let chunks: Vec<Result<Bytes, std::io::Error>> = chunks
        .iter()
        .map(|c| Ok(Bytes::from_static(c.as_bytes())))
        .collect();
    Body::from_stream(futures::stream::iter(chunks))
}

/// Always answers 503 and records every body it received.
fn recording_unavailable() -> (impl Invoker, Arc<Mutex<Vec<Bytes>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let b = Arc::clone(&bodies);
    let svc = invoker_fn(move |req: HttpRequest| {
        let b = Arc::clone(&b);
        async move {
            let body = req
                .into_body()
                .collect()
                .await
                .map_err(tower_requester::Error::BodyRead)?
                .to_bytes();
            b.lock().unwrap().push(body);
            let mut resp = HttpResponse::new(Body::empty());
            *resp.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            Ok(resp)
        }
    });
    (svc, bodies)
}

fn retry(attempts: usize) -> RetryConfigBuilder {
    RetryLayer::builder(attempts, Duration::from_millis(1))
        .backoff(BackoffKind::Constant)
        .jitter(0.0)
}

#[tokio::test]
async fn one_shot_body_is_sent_once() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(5).build().unwrap().layer(inner);

    let resp = svc.oneshot(post(stream_body(&["part-1;", "part-2"]))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(bodies.lock().unwrap().as_slice(), &["part-1;part-2"]);
}

#[tokio::test]
async fn rewind_replays_identical_bytes() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(3).build().unwrap().layer(inner);

    let mut req = post(Body::empty());
    req.set_replayable_body("same bytes every time");
    svc.oneshot(req).await.unwrap();

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    assert!(bodies.iter().all(|b| b == "same bytes every time"));
}

#[tokio::test]
async fn custom_rewind_is_called_per_retry() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(3).build().unwrap().layer(inner);
    let rewinds = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&rewinds);

    let mut req = post(Body::from("fresh"));
    req.extensions_mut().insert(Rewind::new(move || {
        r.fetch_add(1, Ordering::SeqCst);
        Ok(Body::from("fresh"))
    }));
    svc.oneshot(req).await.unwrap();

    assert_eq!(rewinds.load(Ordering::SeqCst), 2);
    assert_eq!(bodies.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn buffered_stream_is_replayed() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(3).buffer_bodies(true).build().unwrap().layer(inner);

    svc.oneshot(post(stream_body(&["a", "b", "c"]))).await.unwrap();

    assert_eq!(bodies.lock().unwrap().as_slice(), &["abc", "abc", "abc"]);
}

#[tokio::test]
async fn oversized_body_is_rejected_before_any_call() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(3)
        .buffer_bodies(true)
        .max_buffer_size(1024)
        .build()
        .unwrap()
        .layer(inner);

    let err = svc.oneshot(post(Body::from(vec![b'x'; 4096]))).await.unwrap_err();

    assert!(err.is_body_too_large());
    let message = err.to_string();
    assert!(message.contains("1025"), "{message}");
    assert!(message.contains("1024"), "{message}");
    assert!(bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_body_needs_no_buffering() {
    let (inner, bodies) = recording_unavailable();
    let svc = retry(3).build().unwrap().layer(inner);

    let req = http::Request::get("http://example.com/").body(Body::empty()).unwrap();
    svc.oneshot(req).await.unwrap();

    assert_eq!(bodies.lock().unwrap().len(), 3);
}
