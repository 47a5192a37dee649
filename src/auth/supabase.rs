//! Hosted identity provider client.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::{access_token, AuthError, IdentityProvider, User};

/// Resolves sessions through `GET {url}/auth/v1/user`.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseIdentity {
    pub fn new(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn resolve_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        let Some(token) = access_token(headers) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserResponse = response.json().await?;
                Ok(Some(User {
                    id: user.id,
                    email: user.email.filter(|e| !e.is_empty()),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(AuthError::Status(status.as_u16())),
        }
    }
}
