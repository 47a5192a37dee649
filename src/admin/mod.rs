//! Admin-only read endpoints, mounted under `/api/admin`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/blog", get(list_posts))
        .route("/blog/{id}", get(get_post))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
