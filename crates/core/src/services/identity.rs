//! Identity service client.
//!
//! Authentication is delegated to an external GoTrue-compatible auth API.
//! [`IdentityProvider`] is the seam the rest of the crate depends on;
//! [`GoTrueIdentity`] talks to the real service over HTTP.

use async_trait::async_trait;
use orbit_common::{AppError, AppResult, config::IdentityConfig};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

/// A user record owned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: IdentityUser,
}

/// Result of a sign-up. `session` is `None` while the email is unconfirmed.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: IdentityUser,
    pub session: Option<AuthSession>,
}

/// Operations offered by the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register with email and password.
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpOutcome>;

    /// Exchange email and password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    /// URL the browser follows to start an OAuth sign-in.
    fn oauth_authorize_url(&self, provider: &str) -> AppResult<String>;

    /// Send a password-reset email.
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;

    /// Resolve an access token to its user.
    async fn get_user(&self, access_token: &str) -> AppResult<IdentityUser>;

    /// Revoke an access token.
    async fn sign_out(&self, access_token: &str) -> AppResult<()>;
}

/// HTTP client for a GoTrue-compatible auth API.
#[derive(Clone)]
pub struct GoTrueIdentity {
    client: Client,
    base_url: Url,
    anon_key: String,
    redirect_url: Option<String>,
}

impl GoTrueIdentity {
    /// Build a client from configuration.
    pub fn new(config: &IdentityConfig) -> AppResult<Self> {
        let base_url = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("Invalid identity url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("orbit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(&format!("auth/v1/{path}"))
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Value> {
        let response = self.request(builder).send().await?;
        let status = response.status();
        let body: Value = if status == StatusCode::NO_CONTENT {
            Value::Null
        } else {
            response.json().await.unwrap_or(Value::Null)
        };

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        tracing::debug!(status = %status, message = %message, "Identity service rejected request");
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::BadRequest(message)
            }
            _ => AppError::Identity(message),
        })
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(ToString::to_string)
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body)
        .map_err(|e| AppError::Identity(format!("Unexpected identity response: {e}")))
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpOutcome> {
        let mut url = self.endpoint("signup")?;
        if let Some(redirect) = &self.redirect_url {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        let body = self
            .send(
                self.client
                    .post(url)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        // Auto-confirmed projects answer with a session, others with the bare user.
        if body.get("access_token").is_some() {
            let session: AuthSession = decode(body)?;
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            Ok(SignUpOutcome {
                user: decode(body)?,
                session: None,
            })
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = self
            .send(
                self.client
                    .post(url)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        decode(body)
    }

    fn oauth_authorize_url(&self, provider: &str) -> AppResult<String> {
        let valid = !provider.is_empty()
            && provider
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::BadRequest(format!("Unsupported provider: {provider}")));
        }

        let mut url = self.endpoint("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("provider", provider);
            if let Some(redirect) = &self.redirect_url {
                query.append_pair("redirect_to", redirect);
            }
        }
        Ok(url.to_string())
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let mut url = self.endpoint("recover")?;
        if let Some(redirect) = &self.redirect_url {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        self.send(self.client.post(url).json(&json!({ "email": email })))
            .await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AppResult<IdentityUser> {
        let url = self.endpoint("user")?;
        let body = self
            .send(self.client.get(url).bearer_auth(access_token))
            .await?;
        decode(body)
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let url = self.endpoint("logout")?;
        self.send(self.client.post(url).bearer_auth(access_token))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity(redirect: Option<&str>) -> GoTrueIdentity {
        GoTrueIdentity::new(&IdentityConfig {
            url: "https://project.example.co/".to_string(),
            anon_key: "anon".to_string(),
            redirect_url: redirect.map(ToString::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_oauth_url_includes_provider_and_redirect() {
        let url = identity(Some("http://localhost:3000/feed"))
            .oauth_authorize_url("google")
            .unwrap();

        assert!(url.starts_with("https://project.example.co/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000%2Ffeed"));
    }

    #[test]
    fn test_oauth_rejects_odd_provider_names() {
        let result = identity(None).oauth_authorize_url("goo gle&x=1");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_error_message_prefers_msg() {
        let body = json!({ "error": "invalid_grant", "msg": "Invalid login credentials" });
        assert_eq!(
            error_message(&body).as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(error_message(&Value::Null), None);
    }

    #[test]
    fn test_decode_session() {
        let session: AuthSession = decode(json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1", "email": "alice@example.com", "aud": "authenticated" }
        }))
        .unwrap();

        assert_eq!(session.user.id, "u1");
        assert_eq!(session.expires_in, Some(3600));
    }
}
