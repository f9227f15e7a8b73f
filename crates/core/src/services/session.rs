//! Session resolution and auth lifecycle.

use std::sync::Arc;

use orbit_common::AppResult;
use orbit_db::entities::profile;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::services::identity::{AuthSession, IdentityProvider, IdentityUser, SignUpOutcome};
use crate::services::profile::ProfileService;

/// The signed-in user and their profile, resolved per request.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub user: IdentityUser,
    pub profile: profile::Model,
    #[serde(skip)]
    pub access_token: String,
}

impl SessionContext {
    /// Identity user ID, which is also the profile ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the profile carries the admin flag.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.profile.is_admin
    }
}

/// Auth state changes pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AuthEvent {
    #[serde(rename_all = "camelCase")]
    SignedIn { user_id: String },
    #[serde(rename_all = "camelCase")]
    SignedOut { user_id: String },
    #[serde(rename_all = "camelCase")]
    ProfileUpdated { user_id: String },
}

impl AuthEvent {
    /// User the event concerns.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::SignedIn { user_id }
            | Self::SignedOut { user_id }
            | Self::ProfileUpdated { user_id } => user_id,
        }
    }
}

/// Session service wrapping the identity provider.
#[derive(Clone)]
pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileService,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionService {
    /// Create a new session service.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: ProfileService) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            identity,
            profiles,
            events,
        }
    }

    /// Resolve an access token, creating the profile on first use.
    pub async fn resolve(&self, access_token: &str) -> AppResult<SessionContext> {
        let user = self.identity.get_user(access_token).await?;
        let profile = self.profiles.ensure_profile(&user).await?;

        Ok(SessionContext {
            user,
            profile,
            access_token: access_token.to_string(),
        })
    }

    /// Register with email and password.
    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpOutcome> {
        let outcome = self.identity.sign_up(email, password).await?;

        if outcome.session.is_some() {
            self.profiles.ensure_profile(&outcome.user).await?;
            self.publish(AuthEvent::SignedIn {
                user_id: outcome.user.id.clone(),
            });
        }

        Ok(outcome)
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let session = self.identity.sign_in_with_password(email, password).await?;
        self.profiles.ensure_profile(&session.user).await?;

        tracing::info!(user_id = %session.user.id, "User signed in");
        self.publish(AuthEvent::SignedIn {
            user_id: session.user.id.clone(),
        });
        Ok(session)
    }

    /// Revoke the current session.
    pub async fn sign_out(&self, ctx: &SessionContext) -> AppResult<()> {
        self.identity.sign_out(&ctx.access_token).await?;

        self.publish(AuthEvent::SignedOut {
            user_id: ctx.user_id().to_string(),
        });
        Ok(())
    }

    /// Send a password-reset email.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        self.identity.request_password_reset(email).await
    }

    /// URL that starts an OAuth sign-in.
    pub fn oauth_url(&self, provider: &str) -> AppResult<String> {
        self.identity.oauth_authorize_url(provider)
    }

    /// Announce that a user's profile changed.
    pub fn profile_updated(&self, user_id: &str) {
        self.publish(AuthEvent::ProfileUpdated {
            user_id: user_id.to_string(),
        });
    }

    /// Push an event to subscribers. No subscribers is not an error.
    pub fn publish(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Subscribe to auth events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
