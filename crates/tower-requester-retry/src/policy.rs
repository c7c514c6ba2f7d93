//! Which response statuses trigger a retry.

use http::StatusCode;

/// Status-based retry trigger.
///
/// Transport errors are always retried; this only decides for responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Retry any status of 500 or above.
    #[default]
    ServerErrors,
    /// Retry only the listed statuses.
    RetryOn(Vec<StatusCode>),
    /// Retry every status except the listed ones.
    RetryExcept(Vec<StatusCode>),
}

impl StatusPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        match self {
            StatusPolicy::ServerErrors => status.as_u16() >= 500,
            StatusPolicy::RetryOn(codes) => codes.contains(&status),
            StatusPolicy::RetryExcept(codes) => !codes.contains(&status),
        }
    }
}
