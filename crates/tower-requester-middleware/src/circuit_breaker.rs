//! Delegates each call to an external circuit breaker.
//!
//! The breaker itself (state machine, thresholds, half-open probing) lives
//! outside this crate. The layer only hands it the call to run.

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use tower_requester_core::{Error, HttpRequest, HttpResponse, Invoker};

/// The call a breaker decides whether to run.
pub type BreakerAction = BoxFuture<'static, Result<HttpResponse, Error>>;

/// Circuit breaker that runs or rejects a call.
///
/// Implementations reject with [`Error::CircuitOpen`] when open and otherwise
/// await the action, recording its outcome.
pub trait CircuitBreaker: Send + Sync {
    fn execute(&self, action: BreakerAction) -> BoxFuture<'static, Result<HttpResponse, Error>>;
}

impl<B> CircuitBreaker for Arc<B>
where
    B: CircuitBreaker + ?Sized,
{
    fn execute(&self, action: BreakerAction) -> BoxFuture<'static, Result<HttpResponse, Error>> {
        (**self).execute(action)
    }
}

/// Adapts a closure into a [`CircuitBreaker`].
pub struct CircuitBreakerFn<F> {
    f: F,
}

impl<F> CircuitBreakerFn<F>
where
    F: Fn(BreakerAction) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> CircuitBreaker for CircuitBreakerFn<F>
where
    F: Fn(BreakerAction) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync,
{
    fn execute(&self, action: BreakerAction) -> BoxFuture<'static, Result<HttpResponse, Error>> {
        (self.f)(action)
    }
}

impl<F> fmt::Debug for CircuitBreakerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerFn").finish_non_exhaustive()
    }
}

/// Runs every call through a [`CircuitBreaker`].
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    breaker: Arc<dyn CircuitBreaker>,
}

impl CircuitBreakerLayer {
    pub fn new<B>(breaker: B) -> Self
    where
        B: CircuitBreaker + 'static,
    {
        Self {
            breaker: Arc::new(breaker),
        }
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = Breaker<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Breaker {
            inner,
            breaker: Arc::clone(&self.breaker),
        }
    }
}

/// Service produced by [`CircuitBreakerLayer`].
#[derive(Clone)]
pub struct Breaker<S> {
    inner: S,
    breaker: Arc<dyn CircuitBreaker>,
}

impl<S> Service<HttpRequest> for Breaker<S>
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
        let inner = self.inner.clone();
        let action: BreakerAction = Box::pin(inner.oneshot(request));
        self.breaker.execute(action)
    }
}
