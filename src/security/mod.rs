//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Mutating request:
//!     → origin.rs (same-origin / allowlist check)
//!     → rate_limit.rs (fixed-window per route + client)
//!     → [identity provider resolves the caller]
//!     → access_control.rs (admin allowlist)
//!     → [schema validation]
//!     → sanitize.rs (plain text / rich HTML)
//!     → persistence
//!
//! Every response:
//!     → headers.rs (CSP, frame options, HSTS)
//! ```
//!
//! # Design Decisions
//! - Fail closed: empty admin allowlists grant nothing
//! - Checks return plain values; callers decide the HTTP mapping
//! - No trust in client input

pub mod access_control;
pub mod headers;
pub mod origin;
pub mod rate_limit;
pub mod sanitize;

pub use access_control::AdminAllowlist;
pub use origin::{is_same_origin, AllowedOrigins, OriginCandidates};
pub use rate_limit::{
    FixedWindowLimiter, MemoryRateLimitStore, RateLimitDecision, RateLimitEntry, RateLimitStore,
};
pub use sanitize::{sanitize_plain_text, sanitize_rich_html};
