//! In-memory loading cache with LRU eviction, TTL expiry and single-flight
//! loading.

use crate::loading::{Loader, LoadingCache};
use bytes::Bytes;
use futures::future::BoxFuture;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tower_requester_core::BoxError;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Default number of entries kept.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

type Shared = Result<Option<Bytes>, SharedError>;

/// Loader error shared between a leader and its followers.
#[derive(Debug, Clone)]
pub struct SharedError(Arc<dyn std::error::Error + Send + Sync>);

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for SharedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Errors produced by the cache itself rather than the loader.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MemoryCacheError {
    /// The call running the loader was dropped before it finished.
    #[error("leader cancelled before the value was loaded")]
    LeaderCancelled,
}

#[derive(Clone)]
struct Entry {
    value: Bytes,
    inserted_at: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.inserted_at.elapsed() > ttl)
    }
}

struct Inner {
    store: Mutex<LruCache<String, Entry>>,
    in_flight: Mutex<HashMap<String, broadcast::Sender<Shared>>>,
    ttl: Option<Duration>,
}

impl Inner {
    fn lookup(&self, key: &str) -> Option<Bytes> {
        let mut store = self.store.lock();
        let entry = store.get(key)?;
        if entry.is_expired(self.ttl) {
            store.pop(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert(&self, key: String, value: Bytes) {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };
        self.store.lock().push(key, entry);
    }

    /// Joins an in-flight load for `key` or registers this caller as leader.
    fn join(&self, key: &str) -> Role {
        let mut in_flight = self.in_flight.lock();
        if let Some(sender) = in_flight.get(key) {
            return Role::Follower(sender.subscribe());
        }
        // a leader may have stored the value since the first lookup
        if let Some(value) = self.lookup(key) {
            return Role::Ready(value);
        }
        let (tx, _rx) = broadcast::channel(1);
        in_flight.insert(key.to_string(), tx);
        Role::Leader
    }

    fn complete(&self, key: &str, result: Shared) {
        if let Some(sender) = self.in_flight.lock().remove(key) {
            let _ = sender.send(result);
        }
    }
}

enum Role {
    Ready(Bytes),
    Leader,
    Follower(broadcast::Receiver<Shared>),
}

/// Removes the in-flight entry if the leader is dropped mid-load, which
/// closes the channel and releases its followers.
struct LeaderGuard {
    inner: Arc<Inner>,
    key: String,
    armed: bool,
}

impl LeaderGuard {
    fn complete(mut self, result: Shared) {
        self.armed = false;
        self.inner.complete(&self.key, result);
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.in_flight.lock().remove(&self.key);
        }
    }
}

/// In-memory [`LoadingCache`].
///
/// Entries are evicted least-recently-used first once `max_entries` is
/// reached and expire `ttl` after insertion. Concurrent misses for the same
/// key run one loader; the other callers wait for and share its result.
/// Clones share the same storage.
///
/// ```
/// use std::time::Duration;
/// use tower_requester_cache::MemoryLoadingCache;
///
/// let cache = MemoryLoadingCache::builder()
///     .ttl(Duration::from_secs(60))
///     .max_entries(500)
///     .build();
/// assert!(cache.is_empty());
/// ```
#[derive(Clone)]
pub struct MemoryLoadingCache {
    inner: Arc<Inner>,
}

impl MemoryLoadingCache {
    /// Creates a cache with default settings: 1000 entries, no TTL.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryLoadingCacheBuilder {
        MemoryLoadingCacheBuilder::new()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes one entry. Returns `true` if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.store.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.store.lock().clear();
    }
}

impl Default for MemoryLoadingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryLoadingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLoadingCache")
            .field("len", &self.len())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}

impl LoadingCache for MemoryLoadingCache {
    fn get(&self, key: String, loader: Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            if let Some(value) = inner.lookup(&key) {
                return Ok(Some(value));
            }

            match inner.join(&key) {
                Role::Ready(value) => Ok(Some(value)),
                Role::Follower(mut rx) => {
                    #[cfg(feature = "tracing")]
                    debug!(key = %key, "waiting for in-flight load");

                    match rx.recv().await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(err)) => Err(Box::new(err) as BoxError),
                        Err(_) => Err(Box::new(MemoryCacheError::LeaderCancelled) as BoxError),
                    }
                }
                Role::Leader => {
                    let guard = LeaderGuard {
                        inner: Arc::clone(&inner),
                        key: key.clone(),
                        armed: true,
                    };
                    match loader.await {
                        Ok(value) => {
                            if let Some(value) = &value {
                                inner.insert(key, value.clone());
                            }
                            guard.complete(Ok(value.clone()));
                            Ok(value)
                        }
                        Err(err) => {
                            let shared = SharedError(Arc::from(err));
                            guard.complete(Err(shared.clone()));
                            Err(Box::new(shared) as BoxError)
                        }
                    }
                }
            }
        })
    }
}

/// Builder for [`MemoryLoadingCache`].
pub struct MemoryLoadingCacheBuilder {
    max_entries: usize,
    ttl: Option<Duration>,
}

impl Default for MemoryLoadingCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLoadingCacheBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_entries: 1000
    /// - ttl: none (entries live until evicted)
    pub fn new() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: None,
        }
    }

    /// Sets the maximum number of entries. Values below 1 are raised to 1.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Sets how long an entry stays valid after it is stored.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn build(self) -> MemoryLoadingCache {
        let capacity = NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN);
        MemoryLoadingCache {
            inner: Arc::new(Inner {
                store: Mutex::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                ttl: self.ttl,
            }),
        }
    }
}
