use crate::config::{CacheConfig, CacheConfigBuilder};
use crate::service::Cache;
use std::sync::Arc;
use tower::Layer;

#[cfg(feature = "metrics")]
use metrics::describe_counter;
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower [`Layer`] that serves responses through a loading cache.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use http::Method;
/// use tower::ServiceBuilder;
/// use tower_requester_cache::{CacheLayer, MemoryLoadingCache};
/// use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
///
/// let cache = CacheLayer::builder()
///     .loading_cache(
///         MemoryLoadingCache::builder()
///             .ttl(Duration::from_secs(30))
///             .max_entries(1000)
///             .build(),
///     )
///     .methods([Method::GET, Method::HEAD])
///     .key_with_headers_included(["authorization"])
///     .build();
///
/// let client = ServiceBuilder::new()
///     .layer(cache)
///     .service(invoker_fn(|_req: HttpRequest| async {
///         Ok(HttpResponse::new(Body::from("fresh")))
///     }));
/// ```
#[derive(Clone)]
pub struct CacheLayer {
    config: Arc<CacheConfig>,
}

impl CacheLayer {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a cache layer.
    pub fn builder() -> CacheConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!("cache_hits_total", "Total number of responses served from cache");
                describe_counter!("cache_misses_total", "Total number of cacheable requests sent upstream");
                describe_counter!("cache_bypass_total", "Total number of requests not eligible for caching");
                describe_counter!("cache_not_stored_total", "Total number of upstream responses not stored");
            });
        }
        CacheConfigBuilder::new()
    }
}

impl<S> Layer<S> for CacheLayer {
    type Service = Cache<S>;

    fn layer(&self, service: S) -> Self::Service {
        Cache::new(service, Arc::clone(&self.config))
    }
}
