//! Cache key derivation.

use http::HeaderMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tower_requester_core::{Body, BoxError, HttpRequest};

/// Bytes of the request body that take part in the key.
///
/// Bodies that agree on their first 16 KiB share a key.
pub const MAX_KEY_BODY_SIZE: usize = 16 * 1024;

/// Custom key function. Its return value replaces the URL, method, header and
/// body parts and is hashed like any other key unless debug keys are on.
pub type KeyFn = Arc<dyn Fn(&HttpRequest) -> String + Send + Sync>;

/// Which request headers take part in the key.
///
/// Names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPolicy {
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl HeaderPolicy {
    fn keeps(&self, name: &str) -> bool {
        match self {
            HeaderPolicy::All => true,
            HeaderPolicy::Include(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
            HeaderPolicy::Exclude(names) => !names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

/// How a request is turned into a cache key.
#[derive(Clone, Default)]
pub struct KeyPolicy {
    pub(crate) headers: Option<HeaderPolicy>,
    pub(crate) body: bool,
    pub(crate) key_fn: Option<KeyFn>,
    pub(crate) debug: bool,
}

impl KeyPolicy {
    /// Derives the key for `req`.
    ///
    /// When the body takes part in the key its first bytes are read and put
    /// back, so the request is unchanged for the next layer.
    pub async fn derive(&self, req: &mut HttpRequest) -> Result<String, BoxError> {
        let raw = match &self.key_fn {
            Some(key_fn) => key_fn(req).into_bytes(),
            None => self.raw_key(req).await?,
        };
        if self.debug {
            return Ok(String::from_utf8_lossy(&raw).into_owned());
        }
        Ok(hex::encode(Sha256::digest(&raw)))
    }

    /// `url##method##headers##body`, with header values and body bytes kept
    /// exactly as sent.
    async fn raw_key(&self, req: &mut HttpRequest) -> Result<Vec<u8>, BoxError> {
        let mut raw = Vec::new();
        raw.extend_from_slice(req.uri().to_string().as_bytes());
        raw.extend_from_slice(b"##");
        raw.extend_from_slice(req.method().as_str().as_bytes());
        raw.extend_from_slice(b"##");
        if let Some(policy) = &self.headers {
            raw.extend_from_slice(&render_headers(req.headers(), policy));
        }
        raw.extend_from_slice(b"##");

        if self.body && req.body().is_present() {
            let original = std::mem::take(req.body_mut());
            let (prefix, rest) = original.collect_limited(MAX_KEY_BODY_SIZE).await?;
            raw.extend_from_slice(&prefix);
            *req.body_mut() = Body::prepend(prefix, rest);
        }
        Ok(raw)
    }
}

impl fmt::Debug for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPolicy")
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("key_fn", &self.key_fn.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

/// Renders kept headers as `name:v1%%v2`, sorted and joined with `$$`.
fn render_headers(headers: &HeaderMap, policy: &HeaderPolicy) -> Vec<u8> {
    let mut rendered: Vec<Vec<u8>> = headers
        .keys()
        .filter(|name| policy.keeps(name.as_str()))
        .map(|name| {
            let mut entry = name.as_str().as_bytes().to_vec();
            entry.push(b':');
            for (i, value) in headers.get_all(name).iter().enumerate() {
                if i > 0 {
                    entry.extend_from_slice(b"%%");
                }
                entry.extend_from_slice(value.as_bytes());
            }
            entry
        })
        .collect();
    rendered.sort();
    rendered.join(&b"$$"[..])
}
