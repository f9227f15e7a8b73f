//! Admin endpoints. The admin flag is checked by [`orbit_core::AdminService`].

use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use orbit_common::AppResult;
use orbit_core::{AdminPostView, AdminStats, AdminUserView};
use orbit_db::entities::post as post_entity;

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Success},
};

async fn stats(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AdminStats>> {
    let stats = state.admin_service.dashboard(&session).await?;
    Ok(ApiResponse::ok(stats))
}

async fn list_users(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<AdminUserView>>> {
    let users = state.admin_service.list_users(&session).await?;
    Ok(ApiResponse::ok(users))
}

async fn delete_user(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state.admin_service.delete_user(&session, &id).await?;
    Ok(Success::ok())
}

async fn list_posts(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<AdminPostView>>> {
    let posts = state.admin_service.list_posts(&session).await?;
    Ok(ApiResponse::ok(posts))
}

async fn delete_post(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Success>> {
    state.admin_service.delete_post(&session, &id).await?;
    Ok(Success::ok())
}

/// Repair a post's like and comment counters.
async fn reconcile_post(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<post_entity::Model>> {
    let post = state.admin_service.reconcile_post(&session, &id).await?;
    Ok(ApiResponse::ok(post))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/posts", get(list_posts))
        .route("/posts/{id}", delete(delete_post))
        .route("/posts/{id}/reconcile", post(reconcile_post))
}
