//! Thin layers for HTTP client chains.
//!
//! - [`HeaderLayer`] sets fixed headers, with shortcuts for JSON and basic auth
//! - [`LoggerLayer`] logs requests and responses through `tracing`
//! - [`CircuitBreakerLayer`] runs calls through an injected [`CircuitBreaker`]
//! - [`RepeaterLayer`] runs calls through an injected [`Repeater`]
//!
//! Every service here is itself an
//! [`Invoker`](tower_requester_core::Invoker), so the layers stack in any
//! order with the retry, cache and concurrency layers.
//!
//! # Example
//!
//! ```
//! use tower::ServiceBuilder;
//! use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
//! use tower_requester_middleware::{HeaderLayer, LoggerLayer};
//!
//! let client = ServiceBuilder::new()
//!     .layer(LoggerLayer::new().prefix("api"))
//!     .layer(HeaderLayer::json())
//!     .layer(HeaderLayer::basic_auth("user", "passwd").unwrap())
//!     .service(invoker_fn(|_req: HttpRequest| async {
//!         Ok(HttpResponse::new(Body::empty()))
//!     }));
//! ```

mod circuit_breaker;
mod header;
mod logger;
mod repeater;

pub use circuit_breaker::{Breaker, BreakerAction, CircuitBreaker, CircuitBreakerFn, CircuitBreakerLayer};
pub use header::{HeaderLayer, SetHeaders};
pub use logger::{Logger, LoggerLayer, MAX_LOGGED_BODY};
pub use repeater::{FailedStatus, Repeat, RepeatAction, Repeater, RepeaterFn, RepeaterLayer, StopOn};
