//! Composable HTTP client decorators for Tower.
//!
//! `tower-requester` wraps an HTTP transport, any [`Invoker`], in a chain of
//! decorators. Each decorator is a Tower [`Layer`](tower::Layer) whose service
//! is again an invoker, so they stack in any order. Each one is available as
//! its own crate and as a feature of this crate.
//!
//! # Decorators
//!
//! - **Retry** (`retry` feature): repeats failed calls with constant, linear or
//!   exponential backoff and jitter, replaying the request body safely
//! - **Cache** (`cache` feature): serves repeated requests from a loading
//!   cache, with single-flight loading in the bundled in-memory cache
//! - **Concurrency** (`concurrency` feature): admits at most N calls at once
//! - **Middleware** (`middleware` feature): headers, basic auth, logging, and
//!   delegation to an external circuit breaker or repeater
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! tower-requester = { version = "0.1", features = ["full"] }
//! ```
//!
//! [`Requester`] keeps an ordered list of decorators. The first one added is
//! the outermost:
//!
//! ```rust
//! # #[cfg(all(feature = "retry", feature = "concurrency"))]
//! # {
//! use std::time::Duration;
//! use tower_requester::concurrency::MaxConcurrentLayer;
//! use tower_requester::retry::RetryLayer;
//! use tower_requester::Requester;
//! use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
//!
//! let transport = invoker_fn(|_req: HttpRequest| async {
//!     Ok(HttpResponse::new(Body::from("ok")))
//! });
//!
//! let mut requester = Requester::new(transport);
//! requester
//!     .use_layer(RetryLayer::builder(3, Duration::from_millis(100)).build().unwrap())
//!     .use_layer(MaxConcurrentLayer::builder().max_concurrent(8).build().unwrap());
//! # }
//! ```

mod requester;

pub use requester::{Middleware, Requester};

pub use tower_requester_core as core;
pub use tower_requester_core::{
    invoker_fn, Body, BoxInvoker, Cancellation, Error, HttpRequest, HttpResponse, Invoker,
};

#[cfg(feature = "cache")]
pub use tower_requester_cache as cache;

#[cfg(feature = "concurrency")]
pub use tower_requester_concurrency as concurrency;

#[cfg(feature = "middleware")]
pub use tower_requester_middleware as middleware;

#[cfg(feature = "retry")]
pub use tower_requester_retry as retry;
