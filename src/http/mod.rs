//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, request id)
//!     → request.rs (headers + peer address for the guards)
//!     → pipeline.rs (origin → rate limit → authn → authz → parse → validate)
//!     → blog / contact / admin handlers
//!     → ApiError or JSON response
//! ```

pub mod pipeline;
pub mod request;
pub mod server;

pub use request::{RequestMeta, X_REQUEST_ID};
pub use server::{AppState, HttpServer, Services};
