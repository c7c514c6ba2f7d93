//! Retry metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_requester::retry::{BackoffKind, RetryLayer};
use tower_requester::{invoker_fn, Body, Error, HttpRequest, HttpResponse};

fn layer(name: &str) -> RetryLayer {
    RetryLayer::builder(2, Duration::from_millis(1))
        .backoff(BackoffKind::Constant)
        .jitter(0.0)
        .name(name)
        .build()
        .unwrap()
}

fn get() -> HttpRequest {
    http::Request::get("http://example.com/").body(Body::empty()).unwrap()
}

#[tokio::test]
#[serial]
async fn retry_success_metrics() {
    init_recorder();

    let svc = layer("metrics_retry_ok")
        .layer(invoker_fn(|_req: HttpRequest| async { Ok(HttpResponse::new(Body::empty())) }));
    svc.oneshot(get()).await.unwrap();

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "metrics_retry_ok");
    assert_metric_has_label("retry_calls_total", "result", "success");
    assert_histogram_exists("retry_attempts");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let svc = layer("metrics_retry_down").layer(invoker_fn(|_req: HttpRequest| async {
        Err::<HttpResponse, _>(Error::transport("connection refused"))
    }));
    let _ = svc.oneshot(get()).await;

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "metrics_retry_down");
    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}
