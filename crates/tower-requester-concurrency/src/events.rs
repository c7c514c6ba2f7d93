//! Events emitted by the concurrency gate.

use std::time::{Duration, Instant};
use tower_requester_core::events::ChainEvent;

#[derive(Debug, Clone)]
pub enum GateEvent {
    /// A call acquired a slot.
    Admitted {
        layer_name: String,
        timestamp: Instant,
        in_flight: usize,
        waited: Duration,
    },
    /// A call finished and released its slot.
    Released {
        layer_name: String,
        timestamp: Instant,
        in_flight: usize,
    },
    /// A call was cancelled while waiting for a slot.
    Cancelled {
        layer_name: String,
        timestamp: Instant,
        waited: Duration,
    },
}

impl ChainEvent for GateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GateEvent::Admitted { .. } => "admitted",
            GateEvent::Released { .. } => "released",
            GateEvent::Cancelled { .. } => "cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            GateEvent::Admitted { timestamp, .. }
            | GateEvent::Released { timestamp, .. }
            | GateEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            GateEvent::Admitted { layer_name, .. }
            | GateEvent::Released { layer_name, .. }
            | GateEvent::Cancelled { layer_name, .. } => layer_name,
        }
    }
}
