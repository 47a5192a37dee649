//! Outbound mail for contact messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ContactForm;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail API key is not configured")]
    MissingApiKey,

    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

impl ContactEmail {
    /// Render a sanitized form. Field values must already be free of markup.
    pub fn render(form: &ContactForm, from: &str, to: &str, subject: &str) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: format!(
                "<p>Name: {}</p><p>Email: {}</p><p>Message: {}</p>",
                form.name, form.email, form.message
            ),
        }
    }
}

/// What the mail service returns for an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailReceipt {
    pub id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: ContactEmail) -> Result<MailReceipt, MailError>;
}

/// Resend HTTP API client.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: ContactEmail) -> Result<MailReceipt, MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
