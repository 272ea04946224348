//! Error types for filing synchronization.
//!
//! This module defines [`FilingsError`] which covers all error cases that can occur
//! when fetching, normalizing, storing, or analyzing filing data.

use thiserror::Error;

/// Errors that can occur during filing operations.
#[derive(Error, Debug)]
pub enum FilingsError {
    /// The requested ticker, CIK or company is unknown.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The upstream service could not be reached, returned a non-retryable status,
    /// or kept throttling until retries ran out, and no cached copy exists.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Rate limit signalled by the upstream service (HTTP 429 or 403).
    #[error("Rate limited by upstream: retry after {retry_after:?}")]
    RateLimited {
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// Upstream payload had an unexpected shape or missing fields.
    #[error("Malformed upstream data: {0}")]
    MalformedData(String),

    /// Duplicate primary key on create, unknown entity on update, or invalid identifier.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Error interacting with the entity store.
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl FilingsError {
    /// Returns true for errors that abort a single company's sync without
    /// implying anything about other companies.
    #[must_use]
    pub const fn is_per_company(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UpstreamUnavailable(_))
    }
}

/// Result type alias using [`FilingsError`].
pub type Result<T> = std::result::Result<T, FilingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_company_errors() {
        assert!(FilingsError::NotFound("AAPL".into()).is_per_company());
        assert!(FilingsError::UpstreamUnavailable("facts".into()).is_per_company());
        assert!(!FilingsError::Store("disk full".into()).is_per_company());
        assert!(!FilingsError::Validation("duplicate".into()).is_per_company());
    }
}
