//! Retry layer for HTTP client chains.
//!
//! Retries failed exchanges with a configurable attempt budget, a backoff
//! shape (constant, linear or exponential) with jitter, and status-based
//! triggers. Transport errors are always retried.
//!
//! # Request bodies
//!
//! A body can only be sent again if it can be reproduced:
//! - requests with a [`Rewind`] extension get a fresh body on every attempt;
//! - requests without a body are retried freely;
//! - other requests are sent once, unless [`buffer_bodies`] is enabled, in
//!   which case the body is buffered up to [`max_buffer_size`] bytes and
//!   replayed. Larger bodies fail with [`Error::BodyTooLarge`] before any
//!   attempt is made.
//!
//! # Exhaustion
//!
//! When the last attempt failed with an error, the call fails with
//! [`Error::RetryExhausted`]. When the last attempt produced a retryable
//! status, that response is returned as a success.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use http::StatusCode;
//! use tower::ServiceBuilder;
//! use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
//! use tower_requester_retry::RetryLayer;
//!
//! let retry = RetryLayer::builder(5, Duration::from_millis(50))
//!     .retry_on_statuses([StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE])
//!     .buffer_bodies(true)
//!     .max_buffer_size(64 * 1024)
//!     .on_retry(|attempt, delay| println!("attempt {attempt} after {delay:?}"))
//!     .build()
//!     .unwrap();
//!
//! let client = ServiceBuilder::new()
//!     .layer(retry)
//!     .service(invoker_fn(|_req: HttpRequest| async {
//!         Ok(HttpResponse::new(Body::empty()))
//!     }));
//! ```
//!
//! [`Rewind`]: tower_requester_core::Rewind
//! [`buffer_bodies`]: RetryConfigBuilder::buffer_bodies
//! [`max_buffer_size`]: RetryConfigBuilder::max_buffer_size

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{Backoff, BackoffKind, DEFAULT_MAX_DELAY};
pub use config::{RetryConfig, RetryConfigBuilder, DEFAULT_JITTER, DEFAULT_MAX_BUFFER_SIZE};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::StatusPolicy;

use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};
use tower_requester_core::{
    cancelled, rebuild_request, Body, Cancellation, Error, HttpRequest, HttpResponse, Invoker,
    Rewind,
};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// A Tower [`Service`] that retries failed exchanges.
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    pub fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        Self { inner, config }
    }
}

impl<S> Clone for Retry<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> Service<HttpRequest> for Retry<S>
where
    S: Invoker,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is checked on the inner service before every attempt.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let inner = self.inner.clone();
        let config = Arc::clone(&self.config);
        Box::pin(run(inner, config, req))
    }
}

async fn run<S: Invoker>(
    mut inner: S,
    config: Arc<RetryConfig>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let (mut parts, body) = req.into_parts();
    let cancellation = parts.extensions.get::<Cancellation>().cloned();
    let mut rewind = parts.extensions.get::<Rewind>().cloned();
    let mut attempts = config.attempts;
    let mut body = Some(body);

    let has_body = body.as_ref().is_some_and(Body::is_present);
    if has_body && rewind.is_none() && attempts > 1 {
        if config.buffer_bodies {
            let original = body.take().unwrap_or_default();
            let buffered = buffer_body(&config, original).await?;
            let replay = Rewind::from_bytes(buffered.clone());
            parts.extensions.insert(replay.clone());
            rewind = Some(replay);
            body = Some(Body::from(buffered));
        } else {
            #[cfg(feature = "tracing")]
            debug!(
                retry = %config.name,
                "request body cannot be rewound, sending a single attempt"
            );
            attempts = 1;
        }
    }

    let mut last: Option<Result<HttpResponse, Error>> = None;
    for attempt in 0..attempts {
        if let Some(reason) = cancellation.as_ref().and_then(Cancellation::reason) {
            emit_cancelled(&config, attempt);
            return Err(Error::Cancelled {
                stage: "retry: context error",
                reason,
            });
        }

        if attempt > 0 {
            let delay = config.backoff.delay(attempt);
            config.event_listeners.emit(&RetryEvent::Retry {
                layer_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                delay,
            });

            #[cfg(feature = "metrics")]
            counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

            #[cfg(feature = "tracing")]
            debug!(retry = %config.name, attempt = attempt + 1, ?delay, "retrying request");

            tokio::select! {
                reason = cancelled(cancellation.as_ref()) => {
                    emit_cancelled(&config, attempt);
                    return Err(Error::Cancelled {
                        stage: "retry: context cancelled during delay",
                        reason,
                    });
                }
                () = tokio::time::sleep(delay) => {}
            }

            if let Some(rewind) = &rewind {
                body = Some(rewind.rewind().map_err(Error::Rewind)?);
            }
        }

        let request = rebuild_request(&parts, body.take().unwrap_or_default());
        let result = match inner.ready().await {
            Ok(svc) => svc.call(request).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(resp) if !config.statuses.is_retryable(resp.status()) => {
                config.event_listeners.emit(&RetryEvent::Success {
                    layer_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt + 1,
                });

                #[cfg(feature = "metrics")]
                {
                    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success")
                        .increment(1);
                    histogram!("retry_attempts", "retry" => config.name.clone())
                        .record((attempt + 1) as f64);
                }

                return Ok(resp);
            }
            Ok(resp) => {
                config.event_listeners.emit(&RetryEvent::RetryableStatus {
                    layer_name: config.name.clone(),
                    timestamp: Instant::now(),
                    status: resp.status(),
                    attempts: attempt + 1,
                });
                last = Some(Ok(resp));
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                debug!(retry = %config.name, attempt = attempt + 1, error = %err, "attempt failed");
                last = Some(Err(err));
            }
        }
    }

    config.event_listeners.emit(&RetryEvent::Exhausted {
        layer_name: config.name.clone(),
        timestamp: Instant::now(),
        attempts,
    });

    #[cfg(feature = "metrics")]
    {
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
            .increment(1);
        histogram!("retry_attempts", "retry" => config.name.clone()).record(attempts as f64);
    }

    #[cfg(feature = "tracing")]
    warn!(retry = %config.name, attempts, "retry attempts exhausted");

    match last {
        Some(Ok(resp)) => Ok(resp),
        Some(Err(err)) => Err(Error::RetryExhausted {
            attempts,
            source: Box::new(err),
        }),
        None => Err(Error::middleware("retry: no attempt was made")),
    }
}

/// Reads the whole body, failing when it is larger than the configured cap.
async fn buffer_body(config: &RetryConfig, body: Body) -> Result<Bytes, Error> {
    let limit = config.max_buffer_size;
    let (bytes, _rest) = body
        .collect_limited(limit.saturating_add(1))
        .await
        .map_err(Error::BodyRead)?;

    if bytes.len() > limit {
        config.event_listeners.emit(&RetryEvent::BodyTooLarge {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            size: bytes.len(),
            limit,
        });

        #[cfg(feature = "metrics")]
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "body_too_large")
            .increment(1);

        return Err(Error::BodyTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(bytes)
}

fn emit_cancelled(config: &RetryConfig, attempt: usize) {
    config.event_listeners.emit(&RetryEvent::Cancelled {
        layer_name: config.name.clone(),
        timestamp: Instant::now(),
        attempt,
    });

    #[cfg(feature = "metrics")]
    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "cancelled")
        .increment(1);
}
