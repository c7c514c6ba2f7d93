//! Configuration for the cache layer.

use crate::events::CacheEvent;
use crate::key::{HeaderPolicy, KeyPolicy};
use crate::layer::CacheLayer;
use crate::loading::LoadingCache;
use http::{Method, StatusCode};
use std::sync::Arc;
use tower_requester_core::events::{EventListeners, FnListener};
use tower_requester_core::HttpRequest;

/// Configuration for the cache layer.
pub struct CacheConfig {
    pub(crate) cache: Option<Arc<dyn LoadingCache>>,
    pub(crate) methods: Vec<Method>,
    pub(crate) statuses: Vec<StatusCode>,
    pub(crate) key: KeyPolicy,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    pub(crate) fn allows_method(&self, method: &Method) -> bool {
        self.methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method.as_str()))
    }

    pub(crate) fn is_cacheable(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status)
    }
}

/// Builder for configuring and constructing a cache layer.
pub struct CacheConfigBuilder {
    cache: Option<Arc<dyn LoadingCache>>,
    methods: Vec<Method>,
    statuses: Vec<StatusCode>,
    key: KeyPolicy,
    name: String,
    event_listeners: EventListeners<CacheEvent>,
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Without a loading cache every request passes straight through.
    pub fn new() -> Self {
        Self {
            cache: None,
            methods: vec![Method::GET],
            statuses: vec![StatusCode::OK],
            key: KeyPolicy::default(),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the loading cache that stores responses.
    pub fn loading_cache<C>(mut self, cache: C) -> Self
    where
        C: LoadingCache + 'static,
    {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Sets the methods whose responses are cached.
    ///
    /// Default: `GET`
    pub fn methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Sets the response statuses that are stored.
    ///
    /// Default: `200`
    pub fn statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Includes every request header in the key.
    pub fn key_with_headers(mut self) -> Self {
        self.key.headers = Some(HeaderPolicy::All);
        self
    }

    /// Includes only the named headers in the key.
    pub fn key_with_headers_included<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key.headers = Some(HeaderPolicy::Include(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Includes every header except the named ones in the key.
    pub fn key_with_headers_excluded<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key.headers = Some(HeaderPolicy::Exclude(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Includes the first 16 KiB of the request body in the key.
    pub fn key_with_body(mut self) -> Self {
        self.key.body = true;
        self
    }

    /// Replaces key derivation with a custom function.
    ///
    /// Header and body settings are ignored. The returned string is hashed
    /// like a derived key unless [`debug_keys`](Self::debug_keys) is on.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> String + Send + Sync + 'static,
    {
        self.key.key_fn = Some(Arc::new(f));
        self
    }

    /// Uses the readable key instead of its SHA-256 digest.
    ///
    /// Default: false
    pub fn debug_keys(mut self, enabled: bool) -> Self {
        self.key.debug = enabled;
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback to be invoked when a response is served from the
    /// cache. Receives the cache key.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Hit { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback to be invoked when upstream is called for a
    /// cacheable request. Receives the cache key.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Miss { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a listener for every cache event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    pub fn build_config(self) -> CacheConfig {
        CacheConfig {
            cache: self.cache,
            methods: self.methods,
            statuses: self.statuses,
            key: self.key,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the cache layer.
    pub fn build(self) -> CacheLayer {
        CacheLayer::new(self.build_config())
    }
}
