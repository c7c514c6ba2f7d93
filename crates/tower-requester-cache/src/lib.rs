//! Response cache layer for HTTP client chains.
//!
//! Serves eligible requests through a [`LoadingCache`]: the first caller for a
//! key runs the inner invoker, stores a snapshot of the response, and every
//! later caller with the same key receives a fresh copy without touching
//! upstream. Concurrent callers for the same key share a single upstream call
//! when the loading cache coalesces loads, as [`MemoryLoadingCache`] does.
//!
//! Only responses whose status is in the cacheable set (default `200`) and
//! that carry a body are stored. Everything else is returned to the caller
//! unchanged.
//!
//! # Keys
//!
//! By default the key is the SHA-256 of the URL and method. Headers and the
//! first 16 KiB of the body can be added with
//! [`key_with_headers`](CacheConfigBuilder::key_with_headers) and
//! [`key_with_body`](CacheConfigBuilder::key_with_body), or the whole
//! derivation can be replaced with [`key_fn`](CacheConfigBuilder::key_fn).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use tower_requester_cache::{CacheLayer, MemoryLoadingCache};
//! use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
//!
//! let layer = CacheLayer::builder()
//!     .loading_cache(MemoryLoadingCache::builder().ttl(Duration::from_secs(60)).build())
//!     .on_hit(|key| println!("cache hit: {key}"))
//!     .build();
//!
//! let client = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(invoker_fn(|_req: HttpRequest| async {
//!         Ok(HttpResponse::new(Body::from("fresh")))
//!     }));
//! ```

mod config;
mod events;
mod key;
mod layer;
mod loading;
mod memory;
mod service;
mod snapshot;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use events::CacheEvent;
pub use key::{HeaderPolicy, KeyFn, KeyPolicy, MAX_KEY_BODY_SIZE};
pub use layer::CacheLayer;
pub use loading::{Loader, LoadingCache, LoadingCacheFn};
pub use memory::{
    MemoryCacheError, MemoryLoadingCache, MemoryLoadingCacheBuilder, SharedError,
    DEFAULT_MAX_ENTRIES,
};
pub use service::Cache;
pub use snapshot::CachedResponse;
