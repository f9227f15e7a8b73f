//! Profile settings endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::{get, post},
};
use orbit_common::AppResult;
use orbit_core::{PostView, UpdateProfileInput};
use orbit_db::entities::profile;
use serde::Serialize;

use crate::{
    endpoints::read_file_field, extractors::AuthSession, middleware::AppState,
    response::ApiResponse,
};

/// Settings page: the caller's profile and every post they wrote.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub profile: profile::Model,
    pub posts: Vec<PostView>,
}

async fn show(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SettingsResponse>> {
    let posts = state.post_service.list_by_author(session.user_id()).await?;
    Ok(ApiResponse::ok(SettingsResponse {
        profile: session.profile,
        posts,
    }))
}

async fn update(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<profile::Model>> {
    let profile = state
        .profile_service
        .update(session.user_id(), input)
        .await?;

    state.session_service.profile_updated(session.user_id());
    Ok(ApiResponse::ok(profile))
}

/// Replace the avatar with the uploaded `file` and point the profile at it.
async fn upload_avatar(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<profile::Model>> {
    let (content_type, data) = read_file_field(multipart).await?;

    let url = state
        .upload_service
        .upload_avatar(session.user_id(), &content_type, &data)
        .await?;
    let profile = state
        .profile_service
        .set_avatar_url(session.user_id(), url)
        .await?;

    state.session_service.profile_updated(session.user_id());
    Ok(ApiResponse::ok(profile))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(show).patch(update))
        .route("/avatar", post(upload_avatar))
}
