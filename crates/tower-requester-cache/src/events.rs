//! Events emitted by the cache layer.

use http::StatusCode;
use std::time::Instant;
use tower_requester_core::events::ChainEvent;

#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// The response was served from the cache without calling upstream.
    Hit {
        layer_name: String,
        timestamp: Instant,
        key: String,
    },
    /// Upstream was called to produce the response.
    Miss {
        layer_name: String,
        timestamp: Instant,
        key: String,
    },
    /// The request was not eligible for caching.
    Bypass {
        layer_name: String,
        timestamp: Instant,
    },
    /// The upstream response was returned but not stored.
    NotStored {
        layer_name: String,
        timestamp: Instant,
        status: StatusCode,
    },
}

impl ChainEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Bypass { .. } => "bypass",
            CacheEvent::NotStored { .. } => "not_stored",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Bypass { timestamp, .. }
            | CacheEvent::NotStored { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            CacheEvent::Hit { layer_name, .. }
            | CacheEvent::Miss { layer_name, .. }
            | CacheEvent::Bypass { layer_name, .. }
            | CacheEvent::NotStored { layer_name, .. } => layer_name,
        }
    }
}
