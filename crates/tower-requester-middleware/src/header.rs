//! Layer that sets fixed headers on every request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tower_requester_core::{ConfigError, HttpRequest};

/// Sets each configured header on the request, replacing existing values.
#[derive(Debug, Clone)]
pub struct HeaderLayer {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl HeaderLayer {
    /// Creates a layer from name/value pairs.
    ///
    /// Names and values are validated here, so a bad pair never reaches a
    /// request.
    pub fn new<I, K, V>(headers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                let name = name.as_ref();
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                    ConfigError::InvalidHeader {
                        name: name.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                let value = HeaderValue::from_str(value.as_ref()).map_err(|err| {
                    ConfigError::InvalidHeader {
                        name: name.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                Ok((header, value))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            headers: Arc::new(headers),
        })
    }

    /// `Content-Type` and `Accept` set to `application/json`.
    pub fn json() -> Self {
        let json = HeaderValue::from_static("application/json");
        Self {
            headers: Arc::new(vec![(CONTENT_TYPE, json.clone()), (ACCEPT, json)]),
        }
    }

    /// `Authorization: Basic base64(user:password)`.
    pub fn basic_auth(user: &str, password: &str) -> Result<Self, ConfigError> {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        let value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|err| {
            ConfigError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            headers: Arc::new(vec![(AUTHORIZATION, value)]),
        })
    }
}

impl<S> Layer<S> for HeaderLayer {
    type Service = SetHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SetHeaders {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service produced by [`HeaderLayer`].
#[derive(Debug, Clone)]
pub struct SetHeaders<S> {
    inner: S,
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S> Service<HttpRequest> for SetHeaders<S>
where
    S: Service<HttpRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: HttpRequest) -> Self::Future {
        let headers = request.headers_mut();
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        self.inner.call(request)
    }
}
