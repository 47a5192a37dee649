//! Caller identity.
//!
//! Sessions are owned by an external identity provider. This module only
//! defines the boundary the pipeline calls, plus the hosted implementation.

pub mod supabase;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use supabase::SupabaseIdentity;

/// A resolved caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned {0}")]
    Status(u16),
}

/// Resolves the caller of a request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the request carries no valid session.
    async fn resolve_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError>;
}

/// Used when no provider is configured. Nobody is signed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn resolve_user(&self, _headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        Ok(None)
    }
}

/// Name of the cookie carrying the access token when no bearer header is sent.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Access token from `Authorization: Bearer` or the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
