//! Profile service.

use std::sync::LazyLock;

use chrono::Utc;
use orbit_common::{AppError, AppResult};
use orbit_db::{
    entities::profile,
    is_unique_violation,
    repositories::{FollowRepository, PostRepository, ProfileRepository},
};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::identity::IdentityUser;

/// Placeholder shown in admin listings for profiles without a username.
pub const NO_USERNAME: &str = "No username";

/// Placeholder shown for notification senders without a profile.
pub const UNKNOWN_USER: &str = "Unknown user";

#[allow(clippy::expect_used)]
static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("username pattern compiles")
});

/// Username if set and non-empty, otherwise `fallback`.
#[must_use]
pub fn display_username<'a>(username: Option<&'a str>, fallback: &'a str) -> &'a str {
    match username {
        Some(name) if !name.is_empty() => name,
        _ => fallback,
    }
}

/// Input for updating the caller's own profile.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(regex(
        path = *USERNAME_RE,
        message = "Username must be 3-30 letters, numbers or underscores"
    ))]
    pub username: Option<String>,
    #[validate(length(max = 160))]
    pub bio: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 1024))]
    pub avatar_url: Option<String>,
}

/// Follower, following and post counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
}

/// A profile as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile: profile::Model,
    pub stats: ProfileStats,
    pub is_following: bool,
    pub is_own_profile: bool,
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: ProfileRepository,
    follow_repo: FollowRepository,
    post_repo: PostRepository,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(
        profile_repo: ProfileRepository,
        follow_repo: FollowRepository,
        post_repo: PostRepository,
    ) -> Self {
        Self {
            profile_repo,
            follow_repo,
            post_repo,
        }
    }

    /// Username given to a profile created on first sign-in.
    #[must_use]
    pub fn default_username(user: &IdentityUser) -> String {
        user.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map_or_else(
                || format!("user_{}", user.id.chars().take(8).collect::<String>()),
                ToString::to_string,
            )
    }

    /// Return the user's profile, creating it on first sign-in.
    pub async fn ensure_profile(&self, user: &IdentityUser) -> AppResult<profile::Model> {
        if let Some(existing) = self.profile_repo.find_by_id(&user.id).await? {
            return Ok(existing);
        }

        let model = profile::ActiveModel {
            id: Set(user.id.clone()),
            username: Set(Some(Self::default_username(user))),
            bio: Set(String::new()),
            location: Set(String::new()),
            avatar_url: Set(String::new()),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        match self.profile_repo.create(model).await {
            Ok(created) => {
                tracing::info!(user_id = %created.id, "Created profile on first sign-in");
                Ok(created)
            }
            // A concurrent first request created it.
            Err(e) if is_unique_violation(&e) => self.profile_repo.get_by_id(&user.id).await,
            Err(e) => Err(e),
        }
    }

    /// Get a profile by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<profile::Model> {
        self.profile_repo.get_by_id(id).await
    }

    /// Get a profile by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<profile::Model> {
        self.profile_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Update the caller's own profile.
    pub async fn update(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<profile::Model> {
        input.validate()?;

        let existing = self.profile_repo.get_by_id(user_id).await?;
        let mut active: profile::ActiveModel = existing.into();

        if let Some(username) = input.username {
            active.username = Set(Some(username));
        }
        if let Some(bio) = input.bio {
            active.bio = Set(bio);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(avatar_url);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.profile_repo.update(active).await
    }

    /// Point the profile at a freshly uploaded avatar.
    pub async fn set_avatar_url(&self, user_id: &str, url: String) -> AppResult<profile::Model> {
        self.update(
            user_id,
            UpdateProfileInput {
                avatar_url: Some(url),
                ..Default::default()
            },
        )
        .await
    }

    /// Delete a profile row. Posts, comments and follows by the user remain.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.profile_repo.delete(id).await? == 0 {
            return Err(AppError::UserNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Case-insensitive username search, excluding the searcher.
    pub async fn search(
        &self,
        query: &str,
        searcher_id: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<profile::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        self.profile_repo.search(query, searcher_id, limit).await
    }

    /// Exact follower, following and post counts.
    pub async fn stats(&self, user_id: &str) -> AppResult<ProfileStats> {
        Ok(ProfileStats {
            followers: self.follow_repo.count_followers(user_id).await?,
            following: self.follow_repo.count_following(user_id).await?,
            posts: self.post_repo.count_by_author(user_id).await?,
        })
    }

    /// Profile page data for a username.
    pub async fn profile_view(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<ProfileView> {
        let profile = self.get_by_username(username).await?;
        let stats = self.stats(&profile.id).await?;

        let is_own_profile = viewer_id == Some(profile.id.as_str());
        let is_following = match viewer_id {
            Some(viewer) if !is_own_profile => {
                self.follow_repo.is_following(viewer, &profile.id).await?
            }
            _ => false,
        };

        Ok(ProfileView {
            profile,
            stats,
            is_following,
            is_own_profile,
        })
    }

    /// All profiles, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<profile::Model>> {
        self.profile_repo.find_all_newest().await
    }

    /// Count all profiles.
    pub async fn count(&self) -> AppResult<u64> {
        self.profile_repo.count().await
    }
}
