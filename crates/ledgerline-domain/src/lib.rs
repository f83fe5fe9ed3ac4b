//! ledgerline-domain: Request model and shared types for the Ledgerline client
//!
//! This crate contains the I/O-free building blocks of the client request
//! coordination layer:
//! - Request options, methods, headers and deduplication keys
//! - Error taxonomy and error-envelope message composition
//! - Short-lived response cache
//! - Notification sink and platform transport traits
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ledgerline-domain               │
//! ├─────────────────────────────────────────────┤
//! │  request.rs   - Options, headers, keys      │
//! │  error.rs     - FetchError, failures        │
//! │  envelope.rs  - Error message composition   │
//! │  cache/       - TTL response cache          │
//! │  notify.rs    - Notification sinks          │
//! │  transport.rs - Platform transport trait    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod envelope;
pub mod error;
pub mod notify;
pub mod request;
pub mod transport;

// Re-export commonly used types at the crate root
pub use cache::{ResponseCache, ResponseCacheConfig};
pub use error::{FetchError, FetchResult, TransportFailure};
pub use notify::{Notification, NotificationLevel, NotificationSink};
pub use request::{Headers, Method, RequestKey, RequestOptions};
pub use transport::{OutgoingRequest, PlatformTransport, RawResponse};
