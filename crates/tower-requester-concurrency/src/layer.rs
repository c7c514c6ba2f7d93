//! Tower layer implementation for the concurrency gate.

use crate::config::MaxConcurrentConfig;
use crate::service::MaxConcurrent;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower::Layer;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Layer that caps the number of in-flight calls.
///
/// Every service produced by one layer shares the same slots, so the cap
/// holds across clones and across services built from the same layer.
#[derive(Clone)]
pub struct MaxConcurrentLayer {
    config: Arc<MaxConcurrentConfig>,
    semaphore: Arc<Semaphore>,
}

impl MaxConcurrentLayer {
    /// Creates a layer from a validated configuration.
    pub fn new(config: MaxConcurrentConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config: Arc::new(config),
            semaphore,
        }
    }

    /// Creates a new builder for configuring a concurrency gate.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_requester_concurrency::MaxConcurrentLayer;
    ///
    /// let layer = MaxConcurrentLayer::builder()
    ///     .max_concurrent(16)
    ///     .name("upstream-api")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> crate::MaxConcurrentConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "max_concurrent_calls_admitted_total",
                    "Total number of calls admitted through the gate"
                );
                describe_counter!(
                    "max_concurrent_calls_cancelled_total",
                    "Total number of calls cancelled while waiting for a slot"
                );
                describe_gauge!(
                    "max_concurrent_in_flight",
                    "Current number of calls in flight"
                );
                describe_histogram!(
                    "max_concurrent_wait_duration_seconds",
                    "Time spent waiting for a slot"
                );
            });
        }
        crate::MaxConcurrentConfigBuilder::new()
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }
}

impl<S> Layer<S> for MaxConcurrentLayer {
    type Service = MaxConcurrent<S>;

    fn layer(&self, service: S) -> Self::Service {
        MaxConcurrent::new(
            service,
            Arc::clone(&self.semaphore),
            Arc::clone(&self.config),
        )
    }
}
