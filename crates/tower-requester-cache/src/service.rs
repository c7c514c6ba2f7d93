//! Cache service implementation.

use crate::config::CacheConfig;
use crate::events::CacheEvent;
use crate::snapshot::CachedResponse;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};
use tower_requester_core::{BoxError, Error, HttpRequest, HttpResponse, Invoker};

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Service that serves responses through a loading cache.
#[derive(Clone)]
pub struct Cache<S> {
    inner: S,
    config: Arc<CacheConfig>,
}

impl<S> Cache<S> {
    pub(crate) fn new(inner: S, config: Arc<CacheConfig>) -> Self {
        Self { inner, config }
    }
}

/// State shared between a call and the loader it hands to the cache.
///
/// The request moves into the loader when it runs. A response that must not
/// be stored travels back through `passthrough`.
struct Exchange {
    request: Mutex<Option<HttpRequest>>,
    passthrough: Mutex<Option<HttpResponse>>,
    loaded: AtomicBool,
}

impl Exchange {
    fn new(request: HttpRequest) -> Arc<Self> {
        Arc::new(Self {
            request: Mutex::new(Some(request)),
            passthrough: Mutex::new(None),
            loaded: AtomicBool::new(false),
        })
    }
}

impl<S> Service<HttpRequest> for Cache<S>
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
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let cache = match &config.cache {
                Some(cache) if config.allows_method(request.method()) => Arc::clone(cache),
                _ => {
                    emit_bypass(&config);
                    return inner.ready().await?.call(request).await;
                }
            };

            let key = config.key.derive(&mut request).await.map_err(Error::CacheKey)?;

            let exchange = Exchange::new(request);
            let loader = load(inner.clone(), Arc::clone(&config), Arc::clone(&exchange), key.clone());

            let value = cache
                .get(key.clone(), Box::pin(loader))
                .await
                .map_err(|source| Error::CacheLoad {
                    key: key.clone(),
                    source,
                })?;

            if let Some(response) = exchange.passthrough.lock().take() {
                return Ok(response);
            }

            match value {
                Some(bytes) => {
                    if !exchange.loaded.load(Ordering::Acquire) {
                        emit_hit(&config, &key);
                    }
                    CachedResponse::decode(&bytes)
                        .and_then(|snapshot| snapshot.to_response())
                        .map_err(|source| Error::CacheLoad { key, source })
                }
                None => {
                    // Another caller loaded a response that was not stored.
                    let request = exchange.request.lock().take();
                    match request {
                        Some(request) => inner.ready().await?.call(request).await,
                        None => Err(Error::CacheLoad {
                            key,
                            source: "cache returned no value and the request was consumed".into(),
                        }),
                    }
                }
            }
        })
    }
}

/// Calls upstream on a miss and decides whether the response is stored.
async fn load<S>(
    mut inner: S,
    config: Arc<CacheConfig>,
    exchange: Arc<Exchange>,
    key: String,
) -> Result<Option<bytes::Bytes>, BoxError>
where
    S: Invoker,
{
    exchange.loaded.store(true, Ordering::Release);
    let request = exchange
        .request
        .lock()
        .take()
        .ok_or("loader ran without a request")?;

    config.event_listeners.emit(&CacheEvent::Miss {
        layer_name: config.name.clone(),
        timestamp: Instant::now(),
        key: key.clone(),
    });

    #[cfg(feature = "metrics")]
    counter!("cache_misses_total", "cache" => config.name.clone()).increment(1);

    let response = inner.ready().await?.call(request).await?;
    let status = response.status();

    if !config.is_cacheable(status) || response.body().is_absent() {
        config.event_listeners.emit(&CacheEvent::NotStored {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            status,
        });

        #[cfg(feature = "metrics")]
        counter!("cache_not_stored_total", "cache" => config.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        debug!(cache = %config.name, key = %key, %status, "response not stored");

        *exchange.passthrough.lock() = Some(response);
        return Ok(None);
    }

    let snapshot = CachedResponse::capture(response).await?;
    Ok(Some(snapshot.encode()?))
}

fn emit_bypass(config: &CacheConfig) {
    config.event_listeners.emit(&CacheEvent::Bypass {
        layer_name: config.name.clone(),
        timestamp: Instant::now(),
    });

    #[cfg(feature = "metrics")]
    counter!("cache_bypass_total", "cache" => config.name.clone()).increment(1);
}

fn emit_hit(config: &CacheConfig, key: &str) {
    config.event_listeners.emit(&CacheEvent::Hit {
        layer_name: config.name.clone(),
        timestamp: Instant::now(),
        key: key.to_string(),
    });

    #[cfg(feature = "metrics")]
    counter!("cache_hits_total", "cache" => config.name.clone()).increment(1);

    #[cfg(feature = "tracing")]
    debug!(cache = %config.name, key = %key, "served from cache");
}
