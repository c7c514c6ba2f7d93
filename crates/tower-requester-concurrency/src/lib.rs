//! Bounded concurrency gate for HTTP client chains.
//!
//! Admits at most N calls into the wrapped invoker at once. Further calls
//! wait for a slot; a call whose request carries a
//! [`Cancellation`](tower_requester_core::Cancellation) stops waiting when it
//! fires and fails with [`Error::Cancelled`](tower_requester_core::Error)
//! without reaching the inner invoker. Slots are released on every exit
//! path, including when the call future is dropped.
//!
//! No ordering between waiters is guaranteed.
//!
//! # Example
//!
//! ```
//! use tower::ServiceBuilder;
//! use tower_requester_concurrency::MaxConcurrentLayer;
//! use tower_requester_core::{invoker_fn, Body, HttpRequest, HttpResponse};
//!
//! let gate = MaxConcurrentLayer::builder()
//!     .max_concurrent(8)
//!     .on_admitted(|in_flight, waited| {
//!         println!("admitted ({in_flight} in flight) after {waited:?}");
//!     })
//!     .build()
//!     .unwrap();
//!
//! let client = ServiceBuilder::new()
//!     .layer(gate)
//!     .service(invoker_fn(|_req: HttpRequest| async {
//!         Ok(HttpResponse::new(Body::empty()))
//!     }));
//! ```

mod config;
mod events;
mod layer;
mod service;

pub use config::{MaxConcurrentConfig, MaxConcurrentConfigBuilder};
pub use events::GateEvent;
pub use layer::MaxConcurrentLayer;
pub use service::MaxConcurrent;
