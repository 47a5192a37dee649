//! Per-request metadata used by the guards.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

/// Header carrying the request id, set by `SetRequestIdLayer`.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers and peer address of the current request.
///
/// The peer is `None` when the server was not started with connect info,
/// e.g. when a router is driven directly in tests.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub headers: HeaderMap,
    pub peer: Option<SocketAddr>,
}

impl RequestMeta {
    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self {
            headers: parts.headers.clone(),
            peer,
        })
    }
}
