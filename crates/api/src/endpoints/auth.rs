//! Authentication endpoints.
//!
//! Credentials go straight to the identity service; profiles are created on
//! the first successful sign-in.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use orbit_common::AppResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::AuthSession,
    middleware::AppState,
    response::{ApiResponse, Success},
    sse,
};

/// Email and password credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Password reset request.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Sign-up response. `session` is absent until the email is confirmed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user: orbit_core::IdentityUser,
    pub session: Option<orbit_core::AuthSession>,
    pub confirmation_required: bool,
}

/// Create an account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<ApiResponse<SignupResponse>> {
    req.validate()?;

    let outcome = state
        .session_service
        .sign_up(&req.email, &req.password)
        .await?;

    Ok(ApiResponse::created(SignupResponse {
        confirmation_required: outcome.session.is_none(),
        user: outcome.user,
        session: outcome.session,
    }))
}

/// Sign in with email and password.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<ApiResponse<orbit_core::AuthSession>> {
    req.validate()?;

    let session = state
        .session_service
        .sign_in(&req.email, &req.password)
        .await?;
    Ok(ApiResponse::ok(session))
}

/// Revoke the current session.
async fn signout(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Success>> {
    state.session_service.sign_out(&session).await?;
    Ok(Success::ok())
}

/// Send a password reset email.
async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> AppResult<ApiResponse<Success>> {
    req.validate()?;

    state
        .session_service
        .request_password_reset(&req.email)
        .await?;
    Ok(Success::ok())
}

/// Redirect the browser to the identity service's OAuth flow.
async fn oauth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<Redirect> {
    let url = state.session_service.oauth_url(&provider)?;
    Ok(Redirect::to(&url))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/reset", post(reset))
        .route("/oauth/{provider}", get(oauth))
        .route("/events", get(sse::auth_events))
}
