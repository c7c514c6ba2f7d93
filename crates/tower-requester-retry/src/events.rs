use http::StatusCode;
use std::time::{Duration, Instant};
use tower_requester_core::events::ChainEvent;

/// Events emitted by the retry layer.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is about to be made after `delay`.
    Retry {
        layer_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// A non-retryable response was returned.
    Success {
        layer_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// An attempt returned a retryable status.
    RetryableStatus {
        layer_name: String,
        timestamp: Instant,
        status: StatusCode,
        attempts: usize,
    },
    /// The attempt budget ran out.
    Exhausted {
        layer_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The body was too large to buffer; nothing was sent.
    BodyTooLarge {
        layer_name: String,
        timestamp: Instant,
        size: usize,
        limit: usize,
    },
    /// The request was cancelled before or between attempts.
    Cancelled {
        layer_name: String,
        timestamp: Instant,
        attempt: usize,
    },
}

impl ChainEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::RetryableStatus { .. } => "retryable_status",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::BodyTooLarge { .. } => "body_too_large",
            RetryEvent::Cancelled { .. } => "cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::RetryableStatus { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::BodyTooLarge { timestamp, .. }
            | RetryEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            RetryEvent::Retry { layer_name, .. }
            | RetryEvent::Success { layer_name, .. }
            | RetryEvent::RetryableStatus { layer_name, .. }
            | RetryEvent::Exhausted { layer_name, .. }
            | RetryEvent::BodyTooLarge { layer_name, .. }
            | RetryEvent::Cancelled { layer_name, .. } => layer_name,
        }
    }
}
