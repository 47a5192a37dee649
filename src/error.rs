//! API error type and its JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::blog::store::StoreError;
use crate::contact::{CaptchaError, MailError};
use crate::observability::metrics;
use crate::security::RateLimitDecision;
use crate::validation::{summarize, ValidationIssue};

/// Every way a request can fail.
///
/// Policy rejections short-circuit the pipeline. Collaborator failures are
/// logged and surface as a generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid origin")]
    InvalidOrigin,

    #[error("Too Many Requests")]
    RateLimited(RateLimitDecision),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Validation failed")]
    Validation(Vec<ValidationIssue>),

    #[error("reCAPTCHA verification failed. Please try again.")]
    CaptchaRejected,

    #[error("Not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("captcha error: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidOrigin | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidJson(_) | ApiError::Validation(_) | ApiError::CaptchaRejected => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Captcha(_) | ApiError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label used for the rejection counter.
    fn reason(&self) -> &'static str {
        match self {
            ApiError::InvalidOrigin => "origin",
            ApiError::RateLimited(_) => "rate_limit",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden => "forbidden",
            ApiError::InvalidJson(_) => "invalid_json",
            ApiError::Validation(_) => "validation",
            ApiError::CaptchaRejected => "captcha",
            ApiError::NotFound => "not_found",
            ApiError::Store(_) => "store",
            ApiError::Captcha(_) => "captcha_error",
            ApiError::Mail(_) => "mail",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        metrics::record_rejection(self.reason());

        match self {
            ApiError::RateLimited(decision) => {
                tracing::warn!(limit = decision.limit, reset_secs = decision.reset_secs, "Rate limit exceeded");
                (status, decision.headers(), Json(json!({ "error": message }))).into_response()
            }
            ApiError::Validation(issues) => {
                tracing::debug!(issues = issues.len(), "Validation failed");
                let body = json!({
                    "error": message,
                    "details": summarize(&issues),
                    "issues": issues,
                });
                (status, Json(body)).into_response()
            }
            ApiError::Store(_) | ApiError::Captcha(_) | ApiError::Mail(_) => {
                tracing::error!(error = %message, "Request failed");
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
            ApiError::NotFound => (status, Json(json!({ "error": message }))).into_response(),
            _ => {
                tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::rate_limit::RATELIMIT_REMAINING;
    use crate::validation::PathSegment;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let issues = vec![
            ValidationIssue::new(vec![PathSegment::Key("title".into())], "Title is required"),
            ValidationIssue::new(vec![PathSegment::Key("slug".into())], "Required"),
        ];
        let response = ApiError::Validation(issues).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"], "title: Title is required, slug: Required");
        assert_eq!(body["issues"][1]["path"][0], "slug");
    }

    #[tokio::test]
    async fn test_rate_limited_carries_headers() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_secs: 42,
        };
        let response = ApiError::RateLimited(decision).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RATELIMIT_REMAINING], "0");
        assert_eq!(body_json(response).await["error"], "Too Many Requests");
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        let err = ApiError::Store(StoreError::Status {
            status: 503,
            body: "connection refused to db-internal:5432".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_policy_messages() {
        for (err, status, message) in [
            (ApiError::InvalidOrigin, StatusCode::FORBIDDEN, "Invalid origin"),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized"),
            (ApiError::Forbidden, StatusCode::FORBIDDEN, "Forbidden"),
            (ApiError::NotFound, StatusCode::NOT_FOUND, "Not found"),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await["error"], message);
        }
    }
}
