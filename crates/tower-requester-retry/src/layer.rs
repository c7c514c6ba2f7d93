use crate::{Retry, RetryConfig, RetryConfigBuilder};
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower [`Layer`] that retries failed HTTP exchanges.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tower::ServiceBuilder;
/// use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
/// use tower_requester_retry::{BackoffKind, RetryLayer};
///
/// let retry = RetryLayer::builder(3, Duration::from_millis(100))
///     .backoff(BackoffKind::Linear)
///     .max_delay(Duration::from_secs(2))
///     .build()
///     .unwrap();
///
/// let client = ServiceBuilder::new()
///     .layer(retry)
///     .service(invoker_fn(|_req: HttpRequest| async {
///         Ok(HttpResponse::new(Body::empty()))
///     }));
/// ```
#[derive(Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Creates a layer from a validated configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a builder for `attempts` total attempts with `initial_delay`
    /// as the base delay.
    pub fn builder(attempts: usize, initial_delay: Duration) -> RetryConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "retry_calls_total",
                    "Total calls through the retry layer by outcome"
                );
                describe_counter!(
                    "retry_attempts_total",
                    "Total retry attempts made after the first"
                );
                describe_histogram!(
                    "retry_attempts",
                    "Number of attempts made per call"
                );
            });
        }
        RetryConfigBuilder::new(attempts, initial_delay)
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
