use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::auth::User;
use crate::error::ApiError;
use crate::http::pipeline::{authenticate, authorize};
use crate::http::{AppState, RequestMeta};

/// The authenticated admin, available to handlers behind [`admin_auth_middleware`].
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Resolve the caller and require admin rights: 401 without a session, 403 off the allowlist.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    meta: RequestMeta,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &meta).await?;
    authorize(&state, &user)?;

    request.extensions_mut().insert(AdminUser(user));
    Ok(next.run(request).await)
}
