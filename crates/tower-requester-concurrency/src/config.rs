//! Configuration for the concurrency gate.

use crate::events::GateEvent;
use crate::layer::MaxConcurrentLayer;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_requester_core::events::{EventListeners, FnListener};
use tower_requester_core::ConfigError;

/// Configuration for the concurrency gate.
#[derive(Clone)]
pub struct MaxConcurrentConfig {
    pub(crate) max_concurrent: usize,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<GateEvent>,
}

impl MaxConcurrentConfig {
    pub fn builder() -> MaxConcurrentConfigBuilder {
        MaxConcurrentConfigBuilder::new()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

/// Builder for [`MaxConcurrentConfig`].
pub struct MaxConcurrentConfigBuilder {
    max_concurrent: usize,
    name: String,
    event_listeners: EventListeners<GateEvent>,
}

impl Default for MaxConcurrentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MaxConcurrentConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrent: 8,
            name: "max_concurrent".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets how many calls may be in flight at once.
    ///
    /// Default: 8
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets the name of this gate instance.
    ///
    /// Default: "max_concurrent"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a call is admitted.
    ///
    /// Called with the number of calls in flight including this one, and
    /// how long the call waited for its slot.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GateEvent::Admitted {
                in_flight, waited, ..
            } = event
            {
                f(*in_flight, *waited);
            }
        }));
        self
    }

    /// Registers a callback when a call finishes and frees its slot.
    ///
    /// Called with the number of calls still in flight.
    pub fn on_released<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GateEvent::Released { in_flight, .. } = event {
                f(*in_flight);
            }
        }));
        self
    }

    /// Registers a callback when a call gives up waiting because its request
    /// was cancelled.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GateEvent::Cancelled { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a listener for every gate event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&GateEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Validates the settings and builds the configuration.
    pub fn build_config(self) -> Result<MaxConcurrentConfig, ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_concurrent > Semaphore::MAX_PERMITS {
            return Err(ConfigError::CapacityTooLarge {
                requested: self.max_concurrent,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(MaxConcurrentConfig {
            max_concurrent: self.max_concurrent,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }

    /// Validates the settings and builds the layer.
    pub fn build(self) -> Result<MaxConcurrentLayer, ConfigError> {
        self.build_config().map(MaxConcurrentLayer::new)
    }
}
