//! Concurrency gate service implementation.

use crate::config::MaxConcurrentConfig;
use crate::events::GateEvent;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower::{Service, ServiceExt};
use tower_requester_core::{Cancellation, Error, HttpRequest, HttpResponse, Invoker};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Service that admits at most N concurrent calls to its inner service.
#[derive(Clone)]
pub struct MaxConcurrent<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
    config: Arc<MaxConcurrentConfig>,
}

impl<S> MaxConcurrent<S> {
    pub(crate) fn new(
        inner: S,
        semaphore: Arc<Semaphore>,
        config: Arc<MaxConcurrentConfig>,
    ) -> Self {
        Self {
            inner,
            semaphore,
            config,
        }
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }
}

impl<S> Service<HttpRequest> for MaxConcurrent<S>
where
    S: Invoker,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let semaphore = Arc::clone(&self.semaphore);
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();
        let cancellation = request.extensions().get::<Cancellation>().cloned();

        Box::pin(async move {
            let start = Instant::now();
            let permit = acquire(&semaphore, cancellation.as_ref()).await;
            let waited = start.elapsed();

            let permit = match permit {
                Ok(permit) => permit,
                Err(err) => {
                    if err.is_cancelled() {
                        config.event_listeners.emit(&GateEvent::Cancelled {
                            layer_name: config.name.clone(),
                            timestamp: Instant::now(),
                            waited,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("max_concurrent_calls_cancelled_total", "gate" => config.name.clone())
                            .increment(1);
                    }
                    return Err(err);
                }
            };

            let in_flight = config.max_concurrent - semaphore.available_permits();
            config.event_listeners.emit(&GateEvent::Admitted {
                layer_name: config.name.clone(),
                timestamp: Instant::now(),
                in_flight,
                waited,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("max_concurrent_calls_admitted_total", "gate" => config.name.clone())
                    .increment(1);
                gauge!("max_concurrent_in_flight", "gate" => config.name.clone())
                    .set(in_flight as f64);
                histogram!("max_concurrent_wait_duration_seconds", "gate" => config.name.clone())
                    .record(waited.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(gate = %config.name, in_flight, ?waited, "call admitted");

            let result = match inner.ready().await {
                Ok(svc) => svc.call(request).await,
                Err(err) => Err(err),
            };

            drop(permit);
            let in_flight = config.max_concurrent - semaphore.available_permits();
            config.event_listeners.emit(&GateEvent::Released {
                layer_name: config.name.clone(),
                timestamp: Instant::now(),
                in_flight,
            });

            #[cfg(feature = "metrics")]
            gauge!("max_concurrent_in_flight", "gate" => config.name.clone())
                .set(in_flight as f64);

            result
        })
    }
}

/// Waits for a slot, giving up when the request is cancelled first.
async fn acquire(
    semaphore: &Arc<Semaphore>,
    cancellation: Option<&Cancellation>,
) -> Result<OwnedSemaphorePermit, Error> {
    let acquired = match cancellation {
        Some(cancellation) => tokio::select! {
            biased;
            reason = cancellation.cancelled() => {
                return Err(Error::Cancelled {
                    stage: "max concurrent: cancelled while waiting for a slot",
                    reason,
                });
            }
            permit = Arc::clone(semaphore).acquire_owned() => permit,
        },
        None => Arc::clone(semaphore).acquire_owned().await,
    };
    acquired.map_err(Error::middleware)
}
