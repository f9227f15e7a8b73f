//! Comment endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::delete,
};
use orbit_common::AppResult;

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Success},
};

/// Hide a comment. Author or admin only.
async fn deactivate(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state
        .comment_service
        .deactivate_comment(&session, &id)
        .await?;
    Ok(Success::ok())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", delete(deactivate))
}
