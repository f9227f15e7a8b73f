//! Home feed and explore endpoints.

use axum::{Router, extract::State, routing::get};
use orbit_common::AppResult;
use orbit_core::PostView;

use crate::{extractors::AuthSession, middleware::AppState, response::ApiResponse};

/// Recent posts by followed users and the caller.
async fn feed(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PostView>>> {
    let posts = state
        .post_service
        .list_feed(session.user_id(), state.limits.page_limit)
        .await?;
    Ok(ApiResponse::ok(posts))
}

/// Recent posts from everyone.
async fn explore(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<PostView>>> {
    let posts = state
        .post_service
        .list_explore(state.limits.page_limit)
        .await?;
    Ok(ApiResponse::ok(posts))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed))
        .route("/explore", get(explore))
}
