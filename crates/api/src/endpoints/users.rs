//! User and follow endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use orbit_common::AppResult;
use orbit_core::{FollowView, SessionContext};

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Success},
};

/// The signed-in user and their profile.
async fn me(AuthSession(session): AuthSession) -> ApiResponse<SessionContext> {
    ApiResponse::ok(session)
}

/// Follow a user.
async fn follow(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state
        .follow_service
        .follow(session.user_id(), &user_id)
        .await?;
    Ok(Success::ok())
}

/// Unfollow a user.
async fn unfollow(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state
        .follow_service
        .unfollow(session.user_id(), &user_id)
        .await?;
    Ok(Success::ok())
}

/// Users following the given user.
async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<FollowView>>> {
    let followers = state.follow_service.list_followers(&user_id).await?;
    Ok(ApiResponse::ok(followers))
}

/// Users the given user follows.
async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<FollowView>>> {
    let following = state.follow_service.list_following(&user_id).await?;
    Ok(ApiResponse::ok(following))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/{user_id}/follow", post(follow).delete(unfollow))
        .route("/{user_id}/followers", get(followers))
        .route("/{user_id}/following", get(following))
}
