//! Ordered composition of decorators over a transport.

use std::fmt;
use std::sync::Arc;
use tower::{Layer, ServiceExt};
use tower_requester_core::{boxed, BoxInvoker, Error, HttpRequest, HttpResponse, Invoker};

type Wrap = dyn Fn(BoxInvoker) -> BoxInvoker + Send + Sync;

/// A type-erased decorator: turns an invoker into a wrapped invoker.
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<Wrap>,
}

impl Middleware {
    /// Boxes any layer whose service is an invoker.
    pub fn new<L>(layer: L) -> Self
    where
        L: Layer<BoxInvoker> + Send + Sync + 'static,
        L::Service: Invoker,
    {
        Self {
            wrap: Arc::new(move |inner| boxed(layer.layer(inner))),
        }
    }

    /// Wraps with a plain function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(BoxInvoker) -> BoxInvoker + Send + Sync + 'static,
    {
        Self { wrap: Arc::new(f) }
    }

    fn apply(&self, inner: BoxInvoker) -> BoxInvoker {
        (self.wrap)(inner)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// A transport plus the ordered decorators applied to every call.
///
/// The first middleware added is the outermost: it sees the request first and
/// the response last.
///
/// ```
/// use tower_requester::{Middleware, Requester};
/// use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = invoker_fn(|_req: HttpRequest| async {
///     Ok(HttpResponse::new(Body::from("pong")))
/// });
///
/// let mut requester = Requester::new(transport);
/// requester.use_middleware(Middleware::from_fn(|inner| inner));
///
/// let req = http::Request::get("http://example.com/ping").body(Body::empty()).unwrap();
/// let resp = requester.call(req).await.unwrap();
/// assert_eq!(resp.status(), 200);
/// # }
/// ```
#[derive(Clone)]
pub struct Requester {
    transport: BoxInvoker,
    middlewares: Vec<Middleware>,
}

impl Requester {
    pub fn new<T>(transport: T) -> Self
    where
        T: Invoker,
    {
        Self {
            transport: boxed(transport),
            middlewares: Vec::new(),
        }
    }

    /// Appends a layer to this requester's chain.
    pub fn use_layer<L>(&mut self, layer: L) -> &mut Self
    where
        L: Layer<BoxInvoker> + Send + Sync + 'static,
        L::Service: Invoker,
    {
        self.use_middleware(Middleware::new(layer))
    }

    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Returns a new requester with this one's middlewares plus `layer`.
    ///
    /// `self` is left unchanged.
    pub fn with<L>(&self, layer: L) -> Self
    where
        L: Layer<BoxInvoker> + Send + Sync + 'static,
        L::Service: Invoker,
    {
        self.with_middleware(Middleware::new(layer))
    }

    pub fn with_middleware(&self, middleware: Middleware) -> Self {
        let mut derived = self.clone();
        derived.middlewares.push(middleware);
        derived
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Builds the full chain.
    pub fn service(&self) -> BoxInvoker {
        self.middlewares
            .iter()
            .rev()
            .fold(self.transport.clone(), |inner, middleware| middleware.apply(inner))
    }

    /// Sends one request through the full chain.
    pub async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.service().oneshot(request).await
    }
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}
