//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → logging.rs (structured events, request id from tower-http)
//!     → metrics.rs (request counters and latency histogram)
//!
//! Pipeline guards:
//!     → metrics.rs (rejections by reason, rate-limit hits by identifier)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
