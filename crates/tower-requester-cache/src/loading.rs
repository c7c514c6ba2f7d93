//! The loading cache contract.

use bytes::Bytes;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tower_requester_core::BoxError;

/// Produces the value for a missing key. `None` means "do not store".
pub type Loader = BoxFuture<'static, Result<Option<Bytes>, BoxError>>;

/// Key/value store that computes missing values through a loader.
///
/// Implementations decide eviction and expiry. Concurrent `get` calls for
/// the same key must run at most one loader at a time; the others observe
/// its result. A loader returning `Ok(None)` stores nothing and the caller
/// receives `Ok(None)`.
pub trait LoadingCache: Send + Sync {
    fn get(&self, key: String, loader: Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>>;
}

impl<C> LoadingCache for Arc<C>
where
    C: LoadingCache + ?Sized,
{
    fn get(&self, key: String, loader: Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>> {
        (**self).get(key, loader)
    }
}

/// Adapts a closure into a [`LoadingCache`].
///
/// The closure is responsible for the single-flight guarantee.
pub struct LoadingCacheFn<F> {
    f: F,
}

impl<F> LoadingCacheFn<F>
where
    F: Fn(String, Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LoadingCache for LoadingCacheFn<F>
where
    F: Fn(String, Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>> + Send + Sync,
{
    fn get(&self, key: String, loader: Loader) -> BoxFuture<'static, Result<Option<Bytes>, BoxError>> {
        (self.f)(key, loader)
    }
}

impl<F> fmt::Debug for LoadingCacheFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingCacheFn").finish_non_exhaustive()
    }
}
