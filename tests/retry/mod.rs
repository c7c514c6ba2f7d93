//! Retry tests.
//!
//! Test organization:
//! - retry_behavior.rs: attempt budget, exhaustion and status policies
//! - retry_backoff.rs: delay schedules measured on a paused clock
//! - retry_bodies.rs: body replay, buffering and size limits

mod retry_behavior;
mod retry_bodies;
