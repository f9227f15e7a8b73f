//! HTTP API layer for orbit.
//!
//! This crate provides the REST API and the server-sent event streams:
//!
//! - **Endpoints**: auth, profiles, follows, posts, comments, notifications, admin
//! - **Extractors**: session resolved by the auth middleware
//! - **SSE**: auth state changes and the live unread-notification counter
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

use axum::Router;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};

/// Mount the API under `/api` behind the auth middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
