//! The invoker seam: anything that turns a request into a response.

use std::fmt;
use std::future::Future;
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::Service;

use crate::error::Error;
use crate::{HttpRequest, HttpResponse};

/// Performs one request/response exchange.
///
/// Implemented for every cloneable [`Service`] over [`HttpRequest`] whose
/// future is `Send + 'static`. Transports implement it directly and every
/// layer in this workspace produces one, so layers stack in any order.
pub trait Invoker:
    Service<HttpRequest, Response = HttpResponse, Error = Error, Future: Send + 'static>
    + Clone
    + Send
    + 'static
{
}

impl<S> Invoker for S where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error, Future: Send + 'static>
        + Clone
        + Send
        + 'static
{
}

/// Type-erased [`Invoker`].
pub type BoxInvoker = BoxCloneService<HttpRequest, HttpResponse, Error>;

/// Erases the type of an invoker.
pub fn boxed<S: Invoker>(invoker: S) -> BoxInvoker {
    BoxCloneService::new(invoker)
}

/// Invoker backed by a closure. See [`invoker_fn`].
#[derive(Clone)]
pub struct InvokerFn<F> {
    f: F,
}

/// Adapts an async closure into an [`Invoker`].
///
/// ```
/// use tower::ServiceExt;
/// use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = invoker_fn(|_req: HttpRequest| async {
///     Ok(HttpResponse::new(Body::from("pong")))
/// });
/// let req = http::Request::get("http://example.com/ping").body(Body::empty()).unwrap();
/// let resp = transport.oneshot(req).await.unwrap();
/// assert_eq!(resp.status(), 200);
/// # }
/// ```
pub fn invoker_fn<F, Fut>(f: F) -> InvokerFn<F>
where
    F: Fn(HttpRequest) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    InvokerFn { f }
}

impl<F, Fut> Service<HttpRequest> for InvokerFn<F>
where
    F: Fn(HttpRequest) -> Fut,
    Fut: Future<Output = Result<HttpResponse, Error>>,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = Fut;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        (self.f)(req)
    }
}

impl<F> fmt::Debug for InvokerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokerFn").finish_non_exhaustive()
    }
}
