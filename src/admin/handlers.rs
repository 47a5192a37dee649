use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use super::auth::AdminUser;
use crate::blog::BlogPost;
use crate::config::StoreBackend;
use crate::error::ApiError;
use crate::http::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub store: StoreBackend,
    pub rate_limit_entries: usize,
    pub user_id: String,
}

pub async fn get_status(
    State(state): State<AppState>,
    Extension(AdminUser(user)): Extension<AdminUser>,
) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        store: state.config.store.backend,
        rate_limit_entries: state.limiter.store().tracked_keys(),
        user_id: user.id,
    })
}

/// Every post, drafts included.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.services.posts.list_all().await?))
}

/// One post by id, for editing and previews.
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .services
        .posts
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
