use crate::backoff::{Backoff, BackoffKind, DEFAULT_MAX_DELAY};
use crate::events::RetryEvent;
use crate::layer::RetryLayer;
use crate::policy::StatusPolicy;
use http::StatusCode;
use std::time::Duration;
use tower_requester_core::events::{EventListeners, FnListener};
use tower_requester_core::ConfigError;

/// Default jitter factor.
pub const DEFAULT_JITTER: f64 = 0.1;

/// Default cap on a buffered request body (10 MiB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for the retry layer.
///
/// Built once, then shared read-only by every call through the layer.
pub struct RetryConfig {
    pub(crate) attempts: usize,
    pub(crate) backoff: Backoff,
    pub(crate) statuses: StatusPolicy,
    pub(crate) buffer_bodies: bool,
    pub(crate) max_buffer_size: usize,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a builder for `attempts` total attempts (including the first)
    /// starting with `initial_delay` between them.
    pub fn builder(attempts: usize, initial_delay: Duration) -> RetryConfigBuilder {
        RetryConfigBuilder::new(attempts, initial_delay)
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn statuses(&self) -> &StatusPolicy {
        &self.statuses
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
    kind: BackoffKind,
    jitter: f64,
    retry_on: Option<Vec<StatusCode>>,
    retry_except: Option<Vec<StatusCode>>,
    buffer_bodies: bool,
    max_buffer_size: usize,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl RetryConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_delay: 30s
    /// - backoff: exponential
    /// - jitter: 0.1
    /// - retried statuses: 500 and above
    /// - buffer_bodies: false
    /// - max_buffer_size: 10 MiB
    /// - name: `"<unnamed>"`
    pub fn new(attempts: usize, initial_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
            max_delay: DEFAULT_MAX_DELAY,
            kind: BackoffKind::default(),
            jitter: DEFAULT_JITTER,
            retry_on: None,
            retry_except: None,
            buffer_bodies: false,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Caps every computed delay.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn backoff(mut self, kind: BackoffKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the jitter factor, `0.0` disables jitter.
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter = factor;
        self
    }

    /// Retries responses with exactly these statuses.
    ///
    /// Cannot be combined with [`retry_except_statuses`](Self::retry_except_statuses).
    pub fn retry_on_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.retry_on = Some(statuses.into_iter().collect());
        self
    }

    /// Retries responses with any status except these.
    pub fn retry_except_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.retry_except = Some(statuses.into_iter().collect());
        self
    }

    /// Buffers request bodies that cannot be rewound so they can be replayed.
    ///
    /// Without this, a request with a body and no [`Rewind`] extension is
    /// sent exactly once.
    ///
    /// [`Rewind`]: tower_requester_core::Rewind
    pub fn buffer_bodies(mut self, enabled: bool) -> Self {
        self.buffer_bodies = enabled;
        self
    }

    /// Largest body that will be buffered. Larger bodies fail the call before
    /// any attempt is made.
    pub fn max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    /// Sets the name of this retry instance for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for when a retry is scheduled.
    ///
    /// The callback receives the attempt number about to be made (starting
    /// at 2) and the delay before it.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use tower_requester_retry::RetryLayer;
    ///
    /// let layer = RetryLayer::builder(3, Duration::from_millis(100))
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {} in {:?}", attempt, delay);
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt + 1, *delay);
            }
        }));
        self
    }

    /// Registers a callback for when a non-retryable response comes back.
    ///
    /// The callback receives the number of attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback for when the attempt budget runs out.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a listener for every retry event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Validates the settings and builds the configuration.
    pub fn build_config(self) -> Result<RetryConfig, ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !self.jitter.is_finite() || !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidJitter {
                factor: self.jitter,
            });
        }
        let statuses = match (self.retry_on, self.retry_except) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingStatusLists),
            (Some(codes), None) => StatusPolicy::RetryOn(codes),
            (None, Some(codes)) => StatusPolicy::RetryExcept(codes),
            (None, None) => StatusPolicy::ServerErrors,
        };

        Ok(RetryConfig {
            attempts: self.attempts,
            backoff: Backoff::new(self.kind, self.initial_delay)
                .max_delay(self.max_delay)
                .jitter(self.jitter),
            statuses,
            buffer_bodies: self.buffer_bodies,
            max_buffer_size: self.max_buffer_size,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Validates the settings and builds the layer.
    pub fn build(self) -> Result<RetryLayer, ConfigError> {
        self.build_config().map(RetryLayer::new)
    }
}
