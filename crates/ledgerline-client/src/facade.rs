//! Unified fetch façade: the single entry point for API calls.
//!
//! `fetch_json` routes a call through the single-flight coordinator when
//! `dedupe` is set, and straight to the HTTP transport otherwise. Mutations
//! (POST/PATCH/PUT/DELETE) therefore bypass caching and coalescing unless a
//! caller explicitly opts in.
//!
//! Failures are returned as [`FetchError`] with status and payload, after
//! the notification sink has been told about them exactly once.

use std::sync::Arc;
use std::time::Duration;

use ledgerline_domain::notify::{NoopSink, DEFAULT_ERROR_DURATION};
use ledgerline_domain::{
    FetchError, FetchResult, Method, NotificationSink, PlatformTransport, RequestOptions,
    ResponseCache, ResponseCacheConfig,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::{ClientConfig, ConfigLoadError};
use crate::coordinator::RequestCoordinator;
use crate::transport::{default_headers, HttpTransport, ReqwestTransport};

/// Client for the Ledgerline JSON API.
pub struct ApiClient<P: PlatformTransport> {
    transport: Arc<HttpTransport<P>>,
    coordinator: RequestCoordinator<P>,
}

impl<P: PlatformTransport> ApiClient<P> {
    /// Starts building a client around `platform`.
    pub fn builder(platform: P) -> ApiClientBuilder<P> {
        ApiClientBuilder::new(platform)
    }

    /// Performs a request and returns the response JSON.
    pub async fn fetch_json(&self, url: &str, options: RequestOptions) -> FetchResult<Value> {
        if options.dedupe {
            self.coordinator.run(options.method, url, &options).await
        } else {
            self.transport.execute(options.method, url, &options).await
        }
    }

    /// Performs a request and deserializes the response into `T`.
    ///
    /// A shape mismatch is returned as [`FetchError::Decode`] and is not
    /// reported to the notification sink.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> FetchResult<T> {
        let value = self.fetch_json(url, options).await?;
        serde_json::from_value(value).map_err(|e| {
            warn!(url, error = %e, "response did not match expected shape");
            FetchError::Decode {
                message: e.to_string(),
            }
        })
    }

    /// Plain GET, never cached or coalesced.
    pub async fn get(&self, url: &str) -> FetchResult<Value> {
        self.fetch_json(url, RequestOptions::new()).await
    }

    /// GET through the coordinator, served from cache while fresh.
    pub async fn get_cached(&self, url: &str) -> FetchResult<Value> {
        self.fetch_json(url, RequestOptions::new().dedupe(true))
            .await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> FetchResult<Value> {
        self.send_json(Method::Post, url, body).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> FetchResult<Value> {
        self.send_json(Method::Put, url, body).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> FetchResult<Value> {
        self.send_json(Method::Patch, url, body).await
    }

    pub async fn delete(&self, url: &str) -> FetchResult<Value> {
        self.fetch_json(url, RequestOptions::with_method(Method::Delete))
            .await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> FetchResult<Value> {
        let options = RequestOptions::with_method(method)
            .json_body(body)
            .map_err(|e| FetchError::Invalid {
                message: format!("failed to serialize request body: {e}"),
            })?;
        self.fetch_json(url, options).await
    }

    /// The coordinator, for cache invalidation and inspection.
    pub fn coordinator(&self) -> &RequestCoordinator<P> {
        &self.coordinator
    }

    pub fn transport(&self) -> &Arc<HttpTransport<P>> {
        &self.transport
    }
}

impl ApiClient<ReqwestTransport> {
    /// Builds a `reqwest`-backed client from configuration.
    pub fn from_config(
        config: &ClientConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        let platform = ReqwestTransport::from_settings(&config.api)?;
        Ok(ApiClient::builder(platform)
            .timezone(config.api.resolved_timezone())
            .cache_config(config.cache.to_cache_config())
            .error_duration(config.notifications.error_duration())
            .sink(sink)
            .build())
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder<P: PlatformTransport> {
    platform: P,
    timezone: String,
    cache_config: ResponseCacheConfig,
    sink: Arc<dyn NotificationSink>,
    error_duration: Duration,
}

impl<P: PlatformTransport> ApiClientBuilder<P> {
    /// Defaults: UTC timezone, 4 s cache, no-op notification sink.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            timezone: "UTC".to_string(),
            cache_config: ResponseCacheConfig::default(),
            sink: Arc::new(NoopSink),
            error_duration: DEFAULT_ERROR_DURATION,
        }
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn cache_config(mut self, config: ResponseCacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn error_duration(mut self, duration: Duration) -> Self {
        self.error_duration = duration;
        self
    }

    pub fn build(self) -> ApiClient<P> {
        let transport = Arc::new(
            HttpTransport::new(
                Arc::new(self.platform),
                default_headers(&self.timezone),
                self.sink,
            )
            .with_error_duration(self.error_duration),
        );
        let cache = Arc::new(ResponseCache::new(self.cache_config));
        let coordinator = RequestCoordinator::new(transport.clone(), cache);

        ApiClient {
            transport,
            coordinator,
        }
    }
}
