//! Platform transport abstraction.
//!
//! A [`PlatformTransport`] performs exactly one network round trip and
//! reports what came back. It does not interpret status codes or bodies;
//! classification happens in the client's HTTP transport layer.

use async_trait::async_trait;

use crate::error::TransportFailure;
use crate::request::{Headers, Method};

/// A fully prepared request, with default headers already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// A response as received from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Value of the `content-type` header, if any.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates a JSON response, mainly for tests and mocks.
    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True if the declared content type is JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

/// Trait for the network primitive used by the client.
#[async_trait]
pub trait PlatformTransport: Send + Sync {
    /// Sends the request and returns the raw response.
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportFailure>;
}
