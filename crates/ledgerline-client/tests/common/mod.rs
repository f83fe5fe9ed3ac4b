// Each test file is compiled as a separate crate, so not every helper is
// used in every test file.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ledgerline_client::ApiClient;
use ledgerline_domain::{
    Notification, NotificationSink, OutgoingRequest, PlatformTransport, RawResponse,
    TransportFailure,
};
use tokio::sync::Semaphore;

// ============================================================================
// Scripted platform transport
// ============================================================================

/// Platform transport that replays scripted responses.
///
/// Every `send` is counted and recorded. When gated, `send` blocks until the
/// test releases a permit, which keeps a request in flight for as long as
/// the test needs.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<Result<RawResponse, TransportFailure>>>,
    fallback: Result<RawResponse, TransportFailure>,
    calls: AtomicUsize,
    requests: Mutex<Vec<OutgoingRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    /// Always answers with `fallback` once the script is exhausted.
    pub fn new(fallback: Result<RawResponse, TransportFailure>) -> Self {
        Self::build(fallback, None)
    }

    /// Like `new`, but every send waits for a permit on the returned gate.
    pub fn gated(fallback: Result<RawResponse, TransportFailure>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Self::build(fallback, Some(gate.clone())), gate)
    }

    fn build(
        fallback: Result<RawResponse, TransportFailure>,
        gate: Option<Arc<Semaphore>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                gate,
            }),
        }
    }

    /// Queues a one-off result ahead of the fallback.
    pub fn then(self, result: Result<RawResponse, TransportFailure>) -> Self {
        self.inner.script.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformTransport for ScriptedTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportFailure> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().unwrap().push(request);

        if let Some(gate) = &self.inner.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let next = self.inner.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.inner.fallback.clone())
    }
}

pub fn ok_json(body: &str) -> Result<RawResponse, TransportFailure> {
    Ok(RawResponse::json(200, body))
}

pub fn status_json(status: u16, body: &str) -> Result<RawResponse, TransportFailure> {
    Ok(RawResponse::json(status, body))
}

pub fn connection_refused() -> Result<RawResponse, TransportFailure> {
    Err(TransportFailure::Connect("connection refused".to_string()))
}

// ============================================================================
// Recording notification sink
// ============================================================================

#[derive(Clone, Default)]
pub struct RecordingSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

// ============================================================================
// Client helpers
// ============================================================================

pub fn client_with(transport: ScriptedTransport) -> (ApiClient<ScriptedTransport>, RecordingSink) {
    let sink = RecordingSink::new();
    let client = ApiClient::builder(transport)
        .timezone("Europe/Berlin")
        .sink(Arc::new(sink.clone()))
        .build();
    (client, sink)
}

/// Yields until `condition` holds, failing the test after a generous bound.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after 10000 yields");
}
