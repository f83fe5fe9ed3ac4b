//! `reqwest`-backed platform transport.

use std::time::Duration;

use async_trait::async_trait;
use ledgerline_domain::{Method, OutgoingRequest, PlatformTransport, RawResponse, TransportFailure};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use crate::config::{ApiSettings, ConfigLoadError};

/// Platform transport that sends requests with a shared `reqwest::Client`.
///
/// Relative URLs (`/api/todo`) are resolved against the base URL; absolute
/// `http(s)://` URLs are used as given.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for `base_url` with a default client.
    pub fn new(base_url: &str) -> Result<Self, ConfigLoadError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ConfigLoadError> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigLoadError::Invalid {
            message: format!("api.base_url is not a valid URL ({base_url}): {e}"),
        })?;
        Ok(Self { client, base_url })
    }

    /// Builds the client from API settings.
    ///
    /// A `request_timeout_secs` of 0 leaves the request timeout unset.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ConfigLoadError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs));
        if settings.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(settings.request_timeout_secs));
        }
        let client = builder.build().map_err(|e| ConfigLoadError::Invalid {
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Self::with_client(client, &settings.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `url` against the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportFailure> {
        self.base_url
            .join(url)
            .map_err(|e| TransportFailure::InvalidRequest(format!("{url}: {e}")))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_builder() {
        TransportFailure::InvalidRequest(err.to_string())
    } else if err.is_timeout() {
        TransportFailure::Timeout(err.to_string())
    } else {
        TransportFailure::Connect(err.to_string())
    }
}

#[async_trait]
impl PlatformTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportFailure> {
        let url = self.resolve(&request.url)?;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::Body(e.to_string()))?
            .to_vec();

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}
