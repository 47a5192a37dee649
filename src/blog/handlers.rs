//! Blog endpoints.
//!
//! Writes run the full admin pipeline; reads are public and only ever see
//! published posts.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::model::BlogPost;
use super::validation::{validate_post, validate_post_update};
use crate::error::ApiError;
use crate::http::pipeline::{admit_admin, parse_json, validated};
use crate::http::{AppState, RequestMeta};

pub const CREATE_IDENTIFIER: &str = "blog:post";
pub const UPDATE_IDENTIFIER: &str = "blog:put";
pub const DELETE_IDENTIFIER: &str = "blog:delete";

/// `POST /api/blog`
pub async fn create_post(
    State(state): State<AppState>,
    meta: RequestMeta,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let route = state.config.rate_limit.blog_create;
    let (user, decision) = admit_admin(&state, &meta, CREATE_IDENTIFIER, route).await?;

    let post = validated(validate_post(&parse_json(&body)?))?.sanitized();
    let created = state.services.posts.create(post, &user.id).await?;

    tracing::info!(
        request_id = %meta.request_id(),
        post_id = %created.id,
        slug = %created.slug,
        author_id = %user.id,
        "Blog post created"
    );
    Ok((StatusCode::CREATED, decision.headers(), Json(created)))
}

/// `PUT /api/blog/{id}`
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    meta: RequestMeta,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let route = state.config.rate_limit.blog_update;
    let (user, decision) = admit_admin(&state, &meta, UPDATE_IDENTIFIER, route).await?;

    let patch = validated(validate_post_update(&parse_json(&body)?))?.sanitized();
    let updated = state
        .services
        .posts
        .update(&id, patch)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(
        request_id = %meta.request_id(),
        post_id = %updated.id,
        user_id = %user.id,
        "Blog post updated"
    );
    Ok((decision.headers(), Json(updated)))
}

/// `DELETE /api/blog/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<impl IntoResponse, ApiError> {
    let route = state.config.rate_limit.blog_delete;
    let (user, decision) = admit_admin(&state, &meta, DELETE_IDENTIFIER, route).await?;

    if !state.services.posts.delete(&id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(request_id = %meta.request_id(), post_id = %id, user_id = %user.id, "Blog post deleted");
    Ok((
        decision.headers(),
        Json(json!({ "message": "Post deleted successfully" })),
    ))
}

/// `GET /api/blog`
pub async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.services.posts.list_published().await?))
}

/// `GET /api/blog/slug/{slug}`
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .services
        .posts
        .get_published_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
