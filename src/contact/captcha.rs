//! CAPTCHA verification.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA secret is not configured")]
    MissingSecret,
}

/// Checks a client-supplied CAPTCHA token.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(false)` when the token is rejected or cannot be checked.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, CaptchaError>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA `siteverify` client.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: Option<String>,
}

impl RecaptchaVerifier {
    pub fn new(client: reqwest::Client, verify_url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client,
            verify_url: verify_url.into(),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, CaptchaError> {
        let secret = self.secret.as_deref().ok_or(CaptchaError::MissingSecret)?;

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = match self.client.post(&self.verify_url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "reCAPTCHA verification request failed");
                return Ok(false);
            }
        };

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success {
                    tracing::debug!(codes = ?body.error_codes, "reCAPTCHA token rejected");
                }
                Ok(body.success)
            }
            Err(e) => {
                tracing::error!(error = %e, "reCAPTCHA response unreadable");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_secret_is_an_error() {
        let verifier = RecaptchaVerifier::new(reqwest::Client::new(), "http://127.0.0.1:9", Some(String::new()));
        assert!(matches!(
            verifier.verify("token", None).await,
            Err(CaptchaError::MissingSecret)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_closed() {
        // Port 9 (discard) is not listening in test environments.
        let verifier = RecaptchaVerifier::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/siteverify",
            Some("secret".into()),
        );
        assert!(!verifier.verify("token", Some("127.0.0.1")).await.unwrap());
    }

    #[test]
    fn test_response_shape() {
        let body: SiteVerifyResponse =
            serde_json::from_str(r#"{"success":false,"error-codes":["invalid-input-response"]}"#).unwrap();
        assert!(!body.success);
        assert_eq!(body.error_codes, vec!["invalid-input-response"]);

        let body: SiteVerifyResponse = serde_json::from_str("{}").unwrap();
        assert!(!body.success);
    }
}
