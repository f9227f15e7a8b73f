//! Notification endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use orbit_common::AppResult;
use orbit_core::NotificationView;

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Count},
    sse,
};

async fn list(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<NotificationView>>> {
    let notifications = state
        .notification_service
        .list(session.user_id(), state.limits.notification_limit)
        .await?;
    Ok(ApiResponse::ok(notifications))
}

/// Returns how many notifications were marked.
async fn mark_all_read(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Count>> {
    let count = state
        .notification_service
        .mark_all_read(session.user_id())
        .await?;
    Ok(ApiResponse::ok(Count { count }))
}

async fn unread_count(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Count>> {
    let count = state
        .notification_service
        .unread_count(session.user_id())
        .await?;
    Ok(ApiResponse::ok(Count { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/mark-all-read", post(mark_all_read))
        .route("/unread-count", get(unread_count))
        .route("/stream", get(sse::unread_stream))
}
