//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use orbit_common::{AppError, config::FeedConfig};
use orbit_core::{
    AdminService, CommentService, FollowService, LikeService, NotificationService, PostService,
    ProfileService, SessionService, UploadService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub profile_service: ProfileService,
    pub follow_service: FollowService,
    pub post_service: PostService,
    pub like_service: LikeService,
    pub comment_service: CommentService,
    pub notification_service: NotificationService,
    pub admin_service: AdminService,
    pub upload_service: UploadService,
    pub limits: FeedConfig,
}

/// Bearer token from the `Authorization` header.
pub fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Resolves the bearer token once per request and stores the
/// [`orbit_core::SessionContext`] in the request extensions. Tokens the
/// identity service rejects leave the request anonymous; any other failure
/// (identity service or database down) is returned as the response.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req).map(ToString::to_string) {
        match state.session_service.resolve(&token).await {
            Ok(session) => {
                req.extensions_mut().insert(session);
            }
            Err(e @ (AppError::Unauthorized | AppError::BadRequest(_))) => {
                tracing::debug!(error = %e, "Ignoring unresolvable bearer token");
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
