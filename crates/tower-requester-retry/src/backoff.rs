//! Backoff shapes for spacing retry attempts.

use rand::Rng;
use std::time::Duration;

/// Default cap on a single computed delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// How the delay grows between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffKind {
    /// The same delay before every retry.
    Constant,
    /// `initial * k` before retry `k`.
    Linear,
    /// `initial * 2^(k-1)` before retry `k`.
    #[default]
    Exponential,
}

/// Computes the delay before a retry.
///
/// Retry indices start at 1 (the first retry, i.e. the second attempt).
///
/// ```
/// use std::time::Duration;
/// use tower_requester_retry::{Backoff, BackoffKind};
///
/// let backoff = Backoff::new(BackoffKind::Exponential, Duration::from_millis(100))
///     .max_delay(Duration::from_millis(500));
///
/// assert_eq!(backoff.base_delay(1), Duration::from_millis(100));
/// assert_eq!(backoff.base_delay(3), Duration::from_millis(400));
/// assert_eq!(backoff.base_delay(4), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    kind: BackoffKind,
    initial: Duration,
    max: Duration,
    jitter: f64,
}

impl Backoff {
    /// Creates a backoff with no jitter and the default max delay.
    pub fn new(kind: BackoffKind, initial: Duration) -> Self {
        Self {
            kind,
            initial,
            max: DEFAULT_MAX_DELAY,
            jitter: 0.0,
        }
    }

    pub fn max_delay(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Sets the jitter factor. Must be within `0.0..=1.0`; callers validate.
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter = factor;
        self
    }

    pub fn kind(&self) -> BackoffKind {
        self.kind
    }

    /// The delay before retry `retry` without jitter, clamped to the max delay.
    pub fn base_delay(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let delay = match self.kind {
            BackoffKind::Constant => self.initial,
            BackoffKind::Linear => self
                .initial
                .saturating_mul(u32::try_from(retry).unwrap_or(u32::MAX)),
            BackoffKind::Exponential => {
                let exp = u32::try_from(retry - 1).unwrap_or(u32::MAX);
                let factor = 2u32.checked_pow(exp).unwrap_or(u32::MAX);
                self.initial.saturating_mul(factor)
            }
        };
        delay.min(self.max)
    }

    /// The delay before retry `retry`, with jitter applied.
    ///
    /// Jitter scales the clamped delay by a uniform factor in
    /// `1 - f/2 ..= 1 + f/2`, so the result may exceed the max delay by up to
    /// half the jitter factor.
    pub fn delay(&self, retry: usize) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let half = self.jitter / 2.0;
        let offset = rand::rng().random_range(-half..=half);
        base.mul_f64((1.0 + offset).max(0.0))
    }
}
