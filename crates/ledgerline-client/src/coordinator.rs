//! Keyed single-flight coordinator with a short-lived read cache.
//!
//! For every call the coordinator:
//!
//! 1. Serves a fresh cached value for the key, unless `no_cache` is set
//! 2. Joins the in-flight request for the key, if there is one
//! 3. Otherwise leads: checks the cache once more (a request may have
//!    settled in between), sends the request, caches a success, removes the
//!    in-flight entry and hands the outcome to every waiting caller
//!
//! For any set of calls with the same key issued before the first one
//! settles, exactly one network request is made and all callers receive the
//! same value or the same error. The in-flight entry is removed before the
//! outcome is observed, so a caller retrying after a failure issues a new
//! request instead of replaying the old error.

use std::sync::Arc;

use ledgerline_domain::{
    FetchResult, Method, PlatformTransport, RequestKey, RequestOptions, ResponseCache,
};
use serde_json::Value;
use tracing::debug;

use crate::singleflight::{Singleflight, SingleflightGuard, SingleflightSlot};
use crate::transport::HttpTransport;

/// Coordinates deduplicated, cached reads over an [`HttpTransport`].
pub struct RequestCoordinator<P: PlatformTransport> {
    transport: Arc<HttpTransport<P>>,
    cache: Arc<ResponseCache>,
    singleflight: Singleflight<RequestKey, FetchResult<Value>>,
}

impl<P: PlatformTransport> RequestCoordinator<P> {
    /// Creates a coordinator with its own, empty in-flight table.
    pub fn new(transport: Arc<HttpTransport<P>>, cache: Arc<ResponseCache>) -> Self {
        Self {
            transport,
            cache,
            singleflight: Singleflight::new(),
        }
    }

    /// Runs a request through the cache and the single-flight table.
    pub async fn run(&self, method: Method, url: &str, options: &RequestOptions) -> FetchResult<Value> {
        let key = RequestKey::new(method, url, options.body.as_deref());

        if !options.no_cache {
            if let Some(value) = self.cache.get(&key).await {
                debug!(%key, "serving cached response");
                return Ok(value);
            }
        }

        self.run_single_flight(key, options).await
    }

    async fn run_single_flight(&self, key: RequestKey, options: &RequestOptions) -> FetchResult<Value> {
        loop {
            match self.singleflight.acquire(key.clone()) {
                SingleflightSlot::Follower(mut receiver) => match receiver.recv().await {
                    Ok(outcome) => {
                        metrics::counter!("ledgerline_singleflight_coalesced_total").increment(1);
                        debug!(%key, "joined in-flight request");
                        return outcome;
                    }
                    Err(_) => {
                        // Leader was dropped before settling; its guard already
                        // removed the entry, so try again and possibly lead.
                        debug!(%key, "in-flight leader went away, retrying");
                        continue;
                    }
                },
                SingleflightSlot::Leader(sender) => {
                    let guard = SingleflightGuard::new(&self.singleflight, key.clone());

                    // A previous leader may have settled between our cache
                    // miss and acquire
                    if !options.no_cache {
                        if let Some(value) = self.cache.get(&key).await {
                            debug!(%key, "served by a request that settled before acquire");
                            guard.complete();
                            let outcome = Ok(value);
                            let _ = sender.send(outcome.clone());
                            return outcome;
                        }
                    }

                    let outcome = self.transport.execute(key.method, &key.url, options).await;

                    if let Ok(value) = &outcome {
                        self.cache.insert(key.clone(), value.clone()).await;
                    }
                    guard.complete();

                    // No receivers is fine
                    let _ = sender.send(outcome.clone());
                    return outcome;
                }
            }
        }
    }

    /// Drops the cached response for one request.
    pub async fn invalidate(&self, method: Method, url: &str, body: Option<&str>) {
        self.cache
            .invalidate(&RequestKey::new(method, url, body))
            .await;
    }

    /// Drops every cached response for `url`.
    pub async fn invalidate_url(&self, url: &str) {
        self.cache.invalidate_url(url).await;
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.singleflight.in_flight_count()
    }

    /// Number of callers waiting on the in-flight request for `key`.
    pub fn waiters(&self, key: &RequestKey) -> usize {
        self.singleflight.waiters(key)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}
