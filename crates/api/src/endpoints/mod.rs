//! API endpoints.

mod admin;
mod auth;
mod comments;
mod feed;
mod notifications;
mod posts;
mod profiles;
mod settings;
mod users;

use axum::{
    Json, Router,
    extract::Multipart,
    routing::get,
};
use orbit_common::{AppError, AppResult};
use serde_json::{Value, json};

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(feed::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/profiles", profiles::router())
        .nest("/settings", settings::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Read the multipart field named `file`. Returns its content type and bytes.
pub(crate) async fn read_file_field(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(ToString::to_string)
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((content_type, data.to_vec()));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}
