//! http-download-speed - sustained HTTP download throughput measurement
//!
//! This library runs several concurrent fetch loops against one URL, each
//! optionally capped at a per-worker byte rate, with an optional global cap
//! on the request rate, and periodically reports the realized throughput
//! (bit/s) and request rate.
//!
//! # Features
//!
//! - Token bucket rate limiting per worker (bytes) and across workers (requests)
//! - Lock-free shared transfer counters
//! - Fixed-interval reporting with SI-scaled output or JSON lines
//! - Graceful cancellation and per-worker restart with backoff
//! - Asynchronous I/O using tokio and reqwest

pub mod chunk;
pub mod config;
pub mod counters;
pub mod error;
pub mod format;
pub mod interval_reporter;
pub mod token_bucket;
pub mod transport;
pub mod worker;

pub use config::{Config, FailurePolicy};
pub use counters::{CounterSnapshot, TransferCounters};
pub use error::{Error, Result};
pub use speed_test::{ProgressCallback, ProgressEvent, RunSummary, SpeedTest};
pub use token_bucket::RateBucket;
pub use transport::{BodyStream, ReqwestTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
