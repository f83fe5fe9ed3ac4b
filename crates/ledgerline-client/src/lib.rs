//! ledgerline-client: Request coordination for the Ledgerline JSON API
//!
//! This crate contains the client request coordination layer:
//! - HTTP transport with default headers and uniform error classification
//! - Keyed single-flight coordinator with a short-lived read cache
//! - Submission guard against double submissions
//! - Unified fetch façade combining the above
//! - Configuration and logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ledgerline-client               │
//! ├─────────────────────────────────────────────┤
//! │  facade.rs      - ApiClient entry point     │
//! │  coordinator.rs - Dedup + cached reads      │
//! │  singleflight.rs- In-flight table           │
//! │  guard.rs       - Submission locks          │
//! │  transport/     - Classification, reqwest   │
//! │  config.rs      - Configuration management  │
//! │  observability/ - Logging, metrics          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod facade;
pub mod guard;
pub mod observability;
pub mod singleflight;
pub mod transport;

// Re-exports for convenience
pub use config::{ClientConfig, ConfigLoadError};
pub use coordinator::RequestCoordinator;
pub use facade::{ApiClient, ApiClientBuilder};
pub use guard::{with_single_flight, SubmissionLock, SubmissionLocks};
pub use transport::{HttpTransport, ReqwestTransport};
