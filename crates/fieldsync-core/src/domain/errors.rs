//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including key validation failures, invalid state transitions, and the
//! network/cache failure taxonomy used by higher-level fetch operations.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A composite key component contains the reserved separator
    #[error("Invalid key component: {0}")]
    InvalidKeyComponent(String),

    /// Invalid interview identifier format
    #[error("Invalid interview ID: {0}")]
    InvalidInterviewId(String),

    /// Invalid survey identifier (empty or malformed)
    #[error("Invalid survey ID: {0}")]
    InvalidSurveyId(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors surfaced by the remote data source adapter
///
/// Every remote call is classified into one of these variants so downstream
/// logic can distinguish "this resource does not exist" from "the network is
/// unreachable". The two must never be conflated: a 404 on a rotation
/// counter means "no prior interviews", while a timeout means "retry later".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The resource genuinely does not exist server-side; not retried with
    /// the same key
    #[error("Remote resource not found")]
    NotFound,

    /// Transport-level failure (connect, timeout, 5xx); treated as
    /// offline/retry-later
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication rejected (401/403)
    #[error("Unauthorized")]
    Unauthorized,

    /// The server responded but the body could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Returns true if the error is transport-level and a cached fallback
    /// should be preferred over surfacing the failure
    pub fn is_network(&self) -> bool {
        matches!(self, RemoteError::Network(_))
    }
}

/// Failure taxonomy for cache-backed fetch operations
///
/// Storage corruption never appears here: corrupt cache blobs degrade to
/// cache-miss behavior inside the cache layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Requested resource absent locally and the device is unreachable.
    /// Not retryable right now; the UI should suggest reconnecting.
    #[error("No internet connection and no cached data available")]
    OfflineNoCache,

    /// The resource does not exist server-side
    #[error("Resource not found")]
    NotFound,

    /// Transient network failure with no cached fallback available
    #[error("Network error: {0}")]
    Network(String),
}

impl From<RemoteError> for FetchError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound => FetchError::NotFound,
            RemoteError::Network(msg) => FetchError::Network(msg),
            RemoteError::Unauthorized => FetchError::Network("unauthorized".to_string()),
            RemoteError::Protocol(msg) => FetchError::Network(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidKeyComponent("a::b".to_string());
        assert_eq!(err.to_string(), "Invalid key component: a::b");

        let err = DomainError::InvalidState {
            from: "Synced".to_string(),
            to: "Pending".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Synced to Pending"
        );
    }

    #[test]
    fn test_remote_error_classification() {
        assert!(RemoteError::Network("timeout".to_string()).is_network());
        assert!(!RemoteError::NotFound.is_network());
        assert!(!RemoteError::Unauthorized.is_network());
    }

    #[test]
    fn test_fetch_error_from_remote() {
        assert_eq!(FetchError::from(RemoteError::NotFound), FetchError::NotFound);
        assert_eq!(
            FetchError::from(RemoteError::Network("down".to_string())),
            FetchError::Network("down".to_string())
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = FetchError::OfflineNoCache;
        let err2 = FetchError::OfflineNoCache;
        assert_eq!(err1, err2);
        assert_ne!(err1, FetchError::NotFound);
    }
}
