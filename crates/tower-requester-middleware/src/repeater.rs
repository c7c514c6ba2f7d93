//! Delegates each call to an external repeater.
//!
//! A [`Repeater`] owns the repeat strategy (count, delays, when to give up).
//! The layer turns the inner call into a re-runnable action that fails on
//! transport errors and on failing statuses.

use futures::future::BoxFuture;
use http::request::Parts;
use http::StatusCode;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use tower_requester_core::{
    rebuild_request, Body, BoxError, Cancellation, Error, HttpRequest, HttpResponse, Invoker,
    RequestExt, Rewind,
};

/// One run of the wrapped call. Fails when the call should be repeated.
pub type RepeatAction = Box<dyn FnMut() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Errors that end repeating immediately.
pub type StopOn = Arc<dyn Fn(&BoxError) -> bool + Send + Sync>;

/// Runs an action until it succeeds or the repeater gives up.
///
/// Implementations return the last action error when they give up, and
/// return early when `stop_on` accepts an error or the cancellation fires.
pub trait Repeater: Send + Sync {
    fn repeat(
        &self,
        cancellation: Option<Cancellation>,
        action: RepeatAction,
        stop_on: StopOn,
    ) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<R> Repeater for Arc<R>
where
    R: Repeater + ?Sized,
{
    fn repeat(
        &self,
        cancellation: Option<Cancellation>,
        action: RepeatAction,
        stop_on: StopOn,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        (**self).repeat(cancellation, action, stop_on)
    }
}

/// Adapts a closure into a [`Repeater`].
pub struct RepeaterFn<F> {
    f: F,
}

impl<F> RepeaterFn<F>
where
    F: Fn(Option<Cancellation>, RepeatAction, StopOn) -> BoxFuture<'static, Result<(), BoxError>>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Repeater for RepeaterFn<F>
where
    F: Fn(Option<Cancellation>, RepeatAction, StopOn) -> BoxFuture<'static, Result<(), BoxError>>
        + Send
        + Sync,
{
    fn repeat(
        &self,
        cancellation: Option<Cancellation>,
        action: RepeatAction,
        stop_on: StopOn,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        (self.f)(cancellation, action, stop_on)
    }
}

impl<F> fmt::Debug for RepeaterFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterFn").finish_non_exhaustive()
    }
}

/// A response whose status counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedStatus(pub StatusCode);

impl fmt::Display for FailedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for FailedStatus {}

/// Runs every call through a [`Repeater`].
///
/// Without explicit failure codes any status of 400 or above fails the
/// action. With codes, only those statuses fail it.
#[derive(Clone)]
pub struct RepeaterLayer {
    repeater: Arc<dyn Repeater>,
    fail_on: Arc<[StatusCode]>,
    stop_on: StopOn,
}

impl RepeaterLayer {
    pub fn new<R>(repeater: R) -> Self
    where
        R: Repeater + 'static,
    {
        Self {
            repeater: Arc::new(repeater),
            fail_on: Arc::from(Vec::new()),
            stop_on: Arc::new(is_cancellation),
        }
    }

    /// Only these statuses fail the action.
    pub fn fail_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.fail_on = codes.into_iter().collect();
        self
    }

    /// Errors that end repeating immediately.
    ///
    /// Default: cancellation of the request.
    pub fn stop_on<F>(mut self, f: F) -> Self
    where
        F: Fn(&BoxError) -> bool + Send + Sync + 'static,
    {
        self.stop_on = Arc::new(f);
        self
    }
}

impl fmt::Debug for RepeaterLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterLayer")
            .field("fail_on", &self.fail_on)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RepeaterLayer {
    type Service = Repeat<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Repeat {
            inner,
            layer: self.clone(),
        }
    }
}

fn is_cancellation(err: &BoxError) -> bool {
    err.downcast_ref::<Error>().is_some_and(Error::is_cancelled)
}

/// Where each run of the action gets its body.
enum BodySource {
    Rewind(Rewind),
    Empty,
    /// Present body without a rewind: usable by the first run only.
    Once(Mutex<Option<Body>>),
}

impl BodySource {
    fn next(&self) -> Result<Body, BoxError> {
        match self {
            BodySource::Rewind(rewind) => rewind.rewind(),
            BodySource::Empty => Ok(Body::empty()),
            BodySource::Once(body) => body
                .lock()
                .take()
                .ok_or_else(|| "request body cannot be replayed".into()),
        }
    }
}

/// Service produced by [`RepeaterLayer`].
#[derive(Clone)]
pub struct Repeat<S> {
    inner: S,
    layer: RepeaterLayer,
}

impl<S> Service<HttpRequest> for Repeat<S>
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
        let layer = self.layer.clone();

        Box::pin(async move {
            let cancellation = request.cancellation().cloned();
            let rewind = request.rewind().cloned();
            let (parts, body) = request.into_parts();

            let source = match rewind {
                Some(rewind) => BodySource::Rewind(rewind),
                None if body.is_absent() => BodySource::Empty,
                None => BodySource::Once(Mutex::new(Some(body))),
            };

            let last = Arc::new(Mutex::new(None));
            let action = make_action(
                inner,
                Arc::new(parts),
                Arc::new(source),
                Arc::clone(&layer.fail_on),
                Arc::clone(&last),
            );

            layer
                .repeater
                .repeat(cancellation, action, Arc::clone(&layer.stop_on))
                .await
                .map_err(Error::Repeat)?;

            let response = last.lock().take();
            response.ok_or_else(|| Error::Repeat("finished without a response".into()))
        })
    }
}

fn make_action<S>(
    inner: S,
    parts: Arc<Parts>,
    source: Arc<BodySource>,
    fail_on: Arc<[StatusCode]>,
    last: Arc<Mutex<Option<HttpResponse>>>,
) -> RepeatAction
where
    S: Invoker,
{
    Box::new(move || {
        let inner = inner.clone();
        let parts = Arc::clone(&parts);
        let fail_on = Arc::clone(&fail_on);
        let last = Arc::clone(&last);
        let body = source.next();

        Box::pin(async move {
            let request = rebuild_request(&parts, body?);
            let response = inner.oneshot(request).await?;
            let status = response.status();

            let failed = if fail_on.is_empty() {
                status.as_u16() >= 400
            } else {
                fail_on.contains(&status)
            };
            if failed {
                tracing::debug!(%status, "repeater: failing status");
                return Err(FailedStatus(status).into());
            }

            *last.lock() = Some(response);
            Ok(())
        })
    })
}
