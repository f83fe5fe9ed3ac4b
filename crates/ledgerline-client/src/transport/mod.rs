//! HTTP transport: one network call, classified into a value or a [`FetchError`].
//!
//! [`HttpTransport`] sits on top of a [`PlatformTransport`] and is the only
//! place that talks to the network. It applies the default headers, parses
//! JSON bodies, classifies the status and reports every failure to the
//! notification sink exactly once before returning it.

mod platform;

use std::sync::Arc;
use std::time::{Duration, Instant};

use ledgerline_domain::envelope::compose_error_message;
use ledgerline_domain::notify::DEFAULT_ERROR_DURATION;
use ledgerline_domain::{
    FetchError, FetchResult, Headers, Method, Notification, NotificationSink, OutgoingRequest,
    PlatformTransport, RawResponse, RequestOptions,
};
use serde_json::Value;
use tracing::{debug, warn};

pub use platform::ReqwestTransport;

/// Header carrying the client's IANA timezone name.
pub const CLIENT_TZ_HEADER: &str = "x-client-tz";

/// Builds the headers attached to every request.
pub fn default_headers(timezone: &str) -> Headers {
    Headers::new()
        .with("accept", "application/json")
        .with(CLIENT_TZ_HEADER, timezone)
}

/// Transport that classifies responses and surfaces failures.
pub struct HttpTransport<P: PlatformTransport> {
    platform: Arc<P>,
    default_headers: Headers,
    sink: Arc<dyn NotificationSink>,
    error_duration: Duration,
}

impl<P: PlatformTransport> HttpTransport<P> {
    /// Creates a transport with the given default headers and notification sink.
    pub fn new(platform: Arc<P>, default_headers: Headers, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            platform,
            default_headers,
            sink,
            error_duration: DEFAULT_ERROR_DURATION,
        }
    }

    /// Sets how long failure notifications stay on screen.
    pub fn with_error_duration(mut self, duration: Duration) -> Self {
        self.error_duration = duration;
        self
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Builds the outgoing request for `options`.
    ///
    /// Caller headers override the defaults. A body without an explicit
    /// content type is sent as JSON.
    pub fn prepare(&self, method: Method, url: &str, options: &RequestOptions) -> OutgoingRequest {
        let mut headers = self.default_headers.merged_with(&options.headers);
        if options.body.is_some() && !headers.contains("content-type") {
            headers.insert("content-type", "application/json");
        }

        OutgoingRequest {
            method,
            url: url.to_string(),
            headers,
            body: options.body.clone(),
        }
    }

    /// Performs one network call and classifies the outcome.
    ///
    /// `method` takes precedence over `options.method`.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> FetchResult<Value> {
        let request = self.prepare(method, url, options);
        let started = Instant::now();
        metrics::counter!("ledgerline_requests_total", "method" => method.as_str()).increment(1);

        let response = match self.platform.send(request).await {
            Ok(response) => response,
            Err(failure) => {
                let err = FetchError::from(failure);
                warn!(%method, url, error = %err, "request failed before a response arrived");
                self.report(&err);
                return Err(err);
            }
        };

        debug!(
            %method,
            url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );

        let data = parse_json_body(&response);

        if response.is_success() {
            return Ok(success_value(&response, data));
        }

        let err = FetchError::Http {
            message: compose_error_message(response.status, data.as_ref()),
            status: response.status,
            payload: data,
        };
        warn!(%method, url, status = response.status, "request failed");
        self.report(&err);
        Err(err)
    }

    fn report(&self, err: &FetchError) {
        metrics::counter!("ledgerline_request_failures_total").increment(1);
        self.sink
            .notify(Notification::error(err.to_string()).with_duration(self.error_duration));
    }
}

/// Parses the body when the response declares JSON; malformed JSON is `None`.
fn parse_json_body(response: &RawResponse) -> Option<Value> {
    if !response.is_json() || response.body.is_empty() {
        return None;
    }
    match serde_json::from_slice(&response.body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(status = response.status, error = %e, "ignoring unparseable JSON body");
            None
        }
    }
}

/// Value returned for a 2xx response.
///
/// 204 yields `{}`. Any other response without a parsed JSON body (empty,
/// not JSON, or malformed) yields `null`.
fn success_value(response: &RawResponse, data: Option<Value>) -> Value {
    if response.status == 204 {
        return Value::Object(serde_json::Map::new());
    }
    data.unwrap_or(Value::Null)
}
