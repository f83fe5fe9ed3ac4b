//! Error types for API requests.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::{validation_issues, ValidationIssue};

/// Uniform error surfaced for every failed API request.
///
/// Cloneable so that a single outcome can be handed to every caller that
/// was coalesced onto the same in-flight request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The transport call itself failed (offline, DNS, connection refused).
    #[error("network error: {message}")]
    Network { message: String },

    /// A response arrived with a non-2xx status.
    ///
    /// `message` already carries the formatted validation lines, if any.
    #[error("{message}")]
    Http {
        message: String,
        status: u16,
        payload: Option<Value>,
    },

    /// The request could not be built (bad URL, invalid header).
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// A successful response did not match the type the caller asked for.
    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl FetchError {
    /// HTTP status of the failed response, or `None` if no response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed body of the failed response, if it was JSON.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            FetchError::Http { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Field-level validation errors carried in the payload's `errors` array.
    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        self.payload().map(validation_issues).unwrap_or_default()
    }

    /// True for 4xx responses.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s))
    }

    /// True for 5xx responses.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if s >= 500)
    }

    /// True when no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }
}

/// Failure reported by a platform transport before any response arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The connection could not be established or was interrupted.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The platform transport's own timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request was rejected before sending.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<TransportFailure> for FetchError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::InvalidRequest(message) => FetchError::Invalid { message },
            other => FetchError::Network {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for API requests.
pub type FetchResult<T> = Result<T, FetchError>;
