//! Core types for tower-requester.
//!
//! This crate holds everything the layers of a requester chain share:
//! - [`Body`], the request/response body type, and the [`HttpRequest`] /
//!   [`HttpResponse`] aliases
//! - [`Cancellation`], a per-request cancellation signal with optional deadline
//! - [`Rewind`], a request's ability to replay its body
//! - the unified [`Error`] and builder-time [`ConfigError`]
//! - the [`Invoker`] seam with [`BoxInvoker`] and [`invoker_fn`]
//! - the event system used for observability

pub mod body;
pub mod cancel;
pub mod error;
pub mod events;
pub mod invoker;
pub mod request;

pub use body::Body;
pub use cancel::{cancelled, CancelReason, Cancellation};
pub use error::{BoxError, ConfigError, Error};
pub use events::{ChainEvent, EventListener, EventListeners, FnListener};
pub use invoker::{boxed, invoker_fn, BoxInvoker, Invoker, InvokerFn};
pub use request::{rebuild_request, RequestExt, Rewind};

/// Request flowing through a chain.
pub type HttpRequest = http::Request<Body>;

/// Response flowing back through a chain.
pub type HttpResponse = http::Response<Body>;
