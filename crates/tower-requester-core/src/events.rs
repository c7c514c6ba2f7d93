//! Event system for chain layers.
//!
//! Every layer emits typed events (retry scheduled, cache hit, slot admitted
//! and so on) to the listeners registered on its builder.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a layer.
pub trait ChainEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable kind, e.g. `"retry"` or `"hit"`.
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// Name of the layer instance that emitted the event.
    fn layer_name(&self) -> &str;
}

/// Receives events of one type.
pub trait EventListener<E: ChainEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// Listeners registered on one layer instance.
#[derive(Clone)]
pub struct EventListeners<E: ChainEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ChainEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A panicking listener is isolated; the rest still receive the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            #[cfg(feature = "tracing")]
            if result.is_err() {
                tracing::warn!(
                    layer = event.layer_name(),
                    event = event.event_type(),
                    "event listener panicked"
                );
            }

            #[cfg(not(feature = "tracing"))]
            let _ = result;
        }
    }

    /// Builds and emits an event only when someone is listening.
    pub fn emit_with<F>(&self, make: F)
    where
        F: FnOnce() -> E,
    {
        if !self.listeners.is_empty() {
            self.emit(&make());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ChainEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ChainEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Closure-backed listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ChainEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
