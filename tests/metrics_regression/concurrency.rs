//! Concurrency gate metrics regression tests

use super::helpers::*;
use serial_test::serial;
use tower::{Layer, ServiceExt};
use tower_requester::concurrency::MaxConcurrentLayer;
use tower_requester::{invoker_fn, Body, HttpRequest, HttpResponse};

#[tokio::test]
#[serial]
async fn gate_metrics_exist() {
    init_recorder();

    let layer = MaxConcurrentLayer::builder()
        .max_concurrent(2)
        .name("metrics_gate")
        .build()
        .unwrap();
    let svc = layer.layer(invoker_fn(|_req: HttpRequest| async {
        Ok(HttpResponse::new(Body::empty()))
    }));
    let req = http::Request::get("http://example.com/").body(Body::empty()).unwrap();
    svc.oneshot(req).await.unwrap();

    assert_counter_exists("max_concurrent_calls_admitted_total");
    assert_metric_has_label("max_concurrent_calls_admitted_total", "gate", "metrics_gate");
    assert_gauge_exists("max_concurrent_in_flight");
    assert_histogram_exists("max_concurrent_wait_duration_seconds");
}
