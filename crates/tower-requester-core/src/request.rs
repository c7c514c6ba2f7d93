//! Request helpers: body rewind capability and request rebuilding.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;

use crate::body::Body;
use crate::cancel::Cancellation;
use crate::error::BoxError;
use crate::HttpRequest;

type RewindFn = dyn Fn() -> Result<Body, BoxError> + Send + Sync;

/// Produces a fresh, independent copy of a request body.
///
/// Stored as a request extension. The retry layer only retries requests
/// with a present body when this extension exists, or when it is allowed to
/// buffer the body itself.
#[derive(Clone)]
pub struct Rewind {
    f: Arc<RewindFn>,
}

impl Rewind {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Body, BoxError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Replays the same buffered bytes on every call.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::new(move || Ok(Body::from(bytes.clone())))
    }

    /// Returns a fresh body.
    pub fn rewind(&self) -> Result<Body, BoxError> {
        (self.f)()
    }
}

impl fmt::Debug for Rewind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewind").finish_non_exhaustive()
    }
}

/// Extension accessors for requests flowing through a chain.
pub trait RequestExt {
    /// The request's cancellation signal, if any.
    fn cancellation(&self) -> Option<&Cancellation>;

    /// The request's body rewind capability, if any.
    fn rewind(&self) -> Option<&Rewind>;

    /// Replaces the body with `bytes` and installs a matching [`Rewind`].
    fn set_replayable_body(&mut self, bytes: impl Into<Bytes>);
}

impl RequestExt for HttpRequest {
    fn cancellation(&self) -> Option<&Cancellation> {
        self.extensions().get::<Cancellation>()
    }

    fn rewind(&self) -> Option<&Rewind> {
        self.extensions().get::<Rewind>()
    }

    fn set_replayable_body(&mut self, bytes: impl Into<Bytes>) {
        let bytes = bytes.into();
        *self.body_mut() = Body::from(bytes.clone());
        self.extensions_mut().insert(Rewind::from_bytes(bytes));
    }
}

/// Builds a new request from saved `parts` and a body.
///
/// Method, URI, version, headers and extensions are copied.
pub fn rebuild_request(parts: &Parts, body: Body) -> HttpRequest {
    let mut req = HttpRequest::new(body);
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    *req.extensions_mut() = parts.extensions.clone();
    req
}
