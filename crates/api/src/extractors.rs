//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use orbit_common::AppError;
use orbit_core::SessionContext;

/// Signed-in session extractor.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionContext);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(AuthSession)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional session extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthSession(pub Option<SessionContext>);

impl MaybeAuthSession {
    /// The viewer's user ID, if signed in.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(SessionContext::user_id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<SessionContext>().cloned()))
    }
}
