//! `POST /api/send`

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};

use super::{validate_contact, ContactEmail};
use crate::error::ApiError;
use crate::http::pipeline::{check_origin, check_rate_limit, parse_json, validated};
use crate::http::{AppState, RequestMeta};
use crate::security::rate_limit::client_address;

pub const CONTACT_IDENTIFIER: &str = "contact:post";

/// Verify the CAPTCHA, then mail the sanitized message to the site owner.
pub async fn send_message(
    State(state): State<AppState>,
    meta: RequestMeta,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    check_origin(&state, &meta)?;
    let decision = check_rate_limit(&state, &meta, CONTACT_IDENTIFIER, state.config.rate_limit.contact)?;

    let form = validated(validate_contact(&parse_json(&body)?))?;

    let remote_ip = client_address(&meta.headers, meta.peer);
    let remote_ip = (remote_ip != "unknown").then_some(remote_ip.as_str());
    if !state.services.captcha.verify(&form.token, remote_ip).await? {
        return Err(ApiError::CaptchaRejected);
    }

    let contact = &state.config.contact;
    let form = form.sanitized();
    let email = ContactEmail::render(&form, &contact.from, &contact.to, &contact.subject);
    let receipt = state.services.mailer.send(email).await?;

    tracing::info!(request_id = %meta.request_id(), message_id = %receipt.id, "Contact message sent");
    Ok((decision.headers(), Json(receipt)))
}
