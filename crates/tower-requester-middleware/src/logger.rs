//! Request/response logging through `tracing`.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service, ServiceExt};
use tower_requester_core::{Body, Error, HttpRequest, HttpResponse, Invoker};
use tracing::{debug, info};

/// Bytes of the request body included in the log line.
pub const MAX_LOGGED_BODY: usize = 1024;

/// Logs every request at `INFO` and every response at `DEBUG`.
///
/// ```
/// use tower::Layer;
/// use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
/// use tower_requester_middleware::LoggerLayer;
///
/// let logged = LoggerLayer::new()
///     .prefix("billing")
///     .with_body(true)
///     .layer(invoker_fn(|_req: HttpRequest| async {
///         Ok(HttpResponse::new(Body::empty()))
///     }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerLayer {
    prefix: Option<Arc<str>>,
    with_body: bool,
}

impl LoggerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text placed in front of every log message.
    pub fn prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = Some(Arc::from(prefix.as_ref()));
        self
    }

    /// Includes up to 1 KiB of the request body. The body is forwarded
    /// unchanged.
    ///
    /// Default: false
    pub fn with_body(mut self, enabled: bool) -> Self {
        self.with_body = enabled;
        self
    }
}

impl<S> Layer<S> for LoggerLayer {
    type Service = Logger<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logger {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`LoggerLayer`].
#[derive(Debug, Clone)]
pub struct Logger<S> {
    inner: S,
    layer: LoggerLayer,
}

impl<S> Service<HttpRequest> for Logger<S>
where
    S: Invoker,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: HttpRequest) -> Self::Future {
        let mut inner = self.inner.clone();
        let layer = self.layer.clone();

        Box::pin(async move {
            let prefix = layer.prefix.as_deref().unwrap_or("");
            let method = request.method().clone();
            let uri = request.uri().clone();

            if layer.with_body && request.body().is_present() {
                let body = std::mem::take(request.body_mut());
                let (snapshot, rest) = body.collect_limited(MAX_LOGGED_BODY).await.map_err(Error::BodyRead)?;
                info!(
                    prefix,
                    %method,
                    %uri,
                    body = %String::from_utf8_lossy(&snapshot),
                    "request"
                );
                *request.body_mut() = Body::prepend(snapshot, rest);
            } else {
                info!(prefix, %method, %uri, "request");
            }

            let start = Instant::now();
            let result = inner.ready().await?.call(request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(response) => debug!(prefix, %method, %uri, status = %response.status(), ?elapsed, "response"),
                Err(err) => debug!(prefix, %method, %uri, error = %err, ?elapsed, "request failed"),
            }
            result
        })
    }
}
