//! Portfolio API library: the security pipeline, blog and contact endpoints.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod config;
pub mod contact;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod validation;

pub use config::AppConfig;
pub use error::ApiError;
pub use http::{HttpServer, Services};
pub use lifecycle::Shutdown;
