//! Error types shared by every layer.
//!
//! All layers in a chain use the same [`Error`], so composing them never
//! needs `From` conversions. Invalid configuration is reported separately
//! through [`ConfigError`] when a layer is built.
//!
//! ```rust
//! use tower_requester_core::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     if err.is_cancelled() {
//!         "gave up: caller cancelled"
//!     } else if err.is_retry_exhausted() {
//!         "upstream kept failing"
//!     } else if err.is_body_too_large() {
//!         "body too large to retry"
//!     } else {
//!         "other failure"
//!     }
//! }
//!
//! let err = Error::transport(std::io::Error::other("connection reset"));
//! assert_eq!(describe(&err), "other failure");
//! assert_eq!(err.to_string(), "transport error: connection reset");
//! ```

use crate::cancel::CancelReason;

/// Boxed error used for wrapped causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a call through a chain.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Every retry attempt ended in an error.
    #[error("retry: transport error after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    /// The request body exceeded the retry buffer. No attempt was made.
    #[error("retry: request body too large ({size} bytes exceeds {limit} byte limit) - cannot retry")]
    BodyTooLarge { size: usize, limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] BoxError),

    /// The request's rewind capability failed between attempts.
    #[error("retry: failed to get new request body: {0}")]
    Rewind(#[source] BoxError),

    /// A layer observed the request's cancellation signal.
    #[error("{stage}: {reason}")]
    Cancelled {
        stage: &'static str,
        reason: CancelReason,
    },

    #[error("cache key: {0}")]
    CacheKey(#[source] BoxError),

    #[error("cache read for {key}: {source}")]
    CacheLoad {
        key: String,
        #[source]
        source: BoxError,
    },

    /// An injected circuit breaker refused or failed the call.
    #[error("circuit breaker: {0}")]
    CircuitOpen(#[source] BoxError),

    /// An injected repeater gave up.
    #[error("repeater: {0}")]
    Repeat(#[source] BoxError),

    #[error("middleware: {0}")]
    Middleware(#[source] BoxError),
}

impl Error {
    /// Wraps a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    pub fn middleware<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Middleware(err.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Error::RetryExhausted { .. })
    }

    pub fn is_body_too_large(&self) -> bool {
        matches!(self, Error::BodyTooLarge { .. })
    }

    /// Returns the cancellation reason if this is a cancellation error.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Error::Cancelled { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Invalid layer configuration, reported by builders.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("retry: attempts must be at least 1")]
    ZeroAttempts,

    #[error("retry: jitter factor must be within 0.0..=1.0, got {factor}")]
    InvalidJitter { factor: f64 },

    #[error("retry: cannot use both retry_on_statuses and retry_except_statuses")]
    ConflictingStatusLists,

    #[error("max concurrent: limit must be at least 1")]
    ZeroCapacity,

    #[error("max concurrent: limit {requested} exceeds the maximum of {max}")]
    CapacityTooLarge { requested: usize, max: usize },

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },
}
