//! The ordered guards every mutating request passes through.
//!
//! ```text
//! origin → rate limit → authenticate → authorize → parse → validate
//! ```
//!
//! Each guard returns `Err(ApiError)` to short-circuit; handlers chain them
//! with `?` and then sanitize and persist.

use axum::body::Bytes;
use serde_json::Value;

use crate::auth::User;
use crate::config::RouteLimit;
use crate::error::ApiError;
use crate::http::request::RequestMeta;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::rate_limit::client_key;
use crate::security::{is_same_origin, OriginCandidates, RateLimitDecision};
use crate::validation::Validation;

/// Reject cross-origin requests.
pub fn check_origin(state: &AppState, meta: &RequestMeta) -> Result<(), ApiError> {
    let candidates = OriginCandidates::from_headers(&meta.headers);
    if is_same_origin(&candidates, &state.allowed_origins) {
        Ok(())
    } else {
        tracing::debug!(
            request_id = %meta.request_id(),
            origin = %candidates.origin,
            referer = %candidates.referer,
            "Origin check failed"
        );
        Err(ApiError::InvalidOrigin)
    }
}

/// Count this request against `identifier`'s window for the calling client.
///
/// The returned decision is attached to the success response as well.
pub fn check_rate_limit(
    state: &AppState,
    meta: &RequestMeta,
    identifier: &str,
    route: RouteLimit,
) -> Result<RateLimitDecision, ApiError> {
    let key = client_key(identifier, &meta.headers, meta.peer);
    let decision = state.limiter.check(&key, route.limit, route.window_ms);
    if decision.allowed {
        Ok(decision)
    } else {
        metrics::record_rate_limited(identifier);
        Err(ApiError::RateLimited(decision))
    }
}

/// Resolve the caller. Provider failures count as "no session".
pub async fn authenticate(state: &AppState, meta: &RequestMeta) -> Result<User, ApiError> {
    match state.services.identity.resolve_user(&meta.headers).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::error!(request_id = %meta.request_id(), error = %e, "Identity lookup failed");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Require the caller to be on the admin allowlist.
pub fn authorize(state: &AppState, user: &User) -> Result<(), ApiError> {
    if state.admins.is_admin(user) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, "Non-admin attempted an admin operation");
        Err(ApiError::Forbidden)
    }
}

/// Origin, rate limit, authentication and authorization for an admin write.
pub async fn admit_admin(
    state: &AppState,
    meta: &RequestMeta,
    identifier: &str,
    route: RouteLimit,
) -> Result<(User, RateLimitDecision), ApiError> {
    check_origin(state, meta)?;
    let decision = check_rate_limit(state, meta, identifier, route)?;
    let user = authenticate(state, meta).await?;
    authorize(state, &user)?;
    Ok((user, decision))
}

/// Parse a request body as JSON. An empty body is treated as `null`.
pub fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(ApiError::InvalidJson)
}

/// Turn a validation outcome into the handler's error path.
pub fn validated<T>(outcome: Validation<T>) -> Result<T, ApiError> {
    outcome.into_result().map_err(ApiError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{PathSegment, ValidationIssue};

    #[test]
    fn test_parse_json() {
        assert_eq!(parse_json(&Bytes::from_static(b"{\"a\":1}")).unwrap()["a"], 1);
        assert_eq!(parse_json(&Bytes::new()).unwrap(), Value::Null);
        assert!(matches!(
            parse_json(&Bytes::from_static(b"{not json")),
            Err(ApiError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_validated() {
        assert_eq!(validated(Validation::Success(3)).unwrap(), 3);
        let issue = ValidationIssue::new(vec![PathSegment::Key("x".into())], "Required");
        match validated::<u8>(Validation::Failure(vec![issue.clone()])) {
            Err(ApiError::Validation(issues)) => assert_eq!(issues, vec![issue]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
