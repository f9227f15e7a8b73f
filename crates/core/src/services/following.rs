//! Following service.

use chrono::Utc;
use orbit_common::{AppError, AppResult};
use orbit_db::{
    entities::follow,
    is_unique_violation,
    repositories::{FollowRepository, ProfileRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::dispatch::{NotificationDispatcher, NotificationJob};
use crate::services::profile::display_username;

/// One side of a follow edge, with the other user's profile resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowView {
    pub user_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub followed_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    profile_repo: ProfileRepository,
    dispatcher: Option<NotificationDispatcher>,
}

impl FollowService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, profile_repo: ProfileRepository) -> Self {
        Self {
            follow_repo,
            profile_repo,
            dispatcher: None,
        }
    }

    /// Set the notification dispatcher.
    pub fn set_dispatcher(&mut self, dispatcher: NotificationDispatcher) {
        self.dispatcher = Some(dispatcher);
    }

    /// Follow a user.
    ///
    /// The target is not required to have a profile.
    pub async fn follow(&self, follower_id: &str, following_id: &str) -> AppResult<follow::Model> {
        if follower_id == following_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .follow_repo
            .is_following(follower_id, following_id)
            .await?
        {
            return Err(AppError::BadRequest("Already following".to_string()));
        }

        let model = follow::ActiveModel {
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let created = match self.follow_repo.create(model).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::BadRequest("Already following".to_string()));
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(follower_id = %follower_id, following_id = %following_id, "Followed");

        if let Some(ref dispatcher) = self.dispatcher {
            dispatcher.enqueue(NotificationJob::follow(follower_id, following_id));
        }

        Ok(created)
    }

    /// Remove a follow edge. Succeeds whether or not the edge existed.
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        let removed = self
            .follow_repo
            .delete_by_pair(follower_id, following_id)
            .await?;

        tracing::debug!(follower_id = %follower_id, following_id = %following_id, removed, "Unfollowed");
        Ok(())
    }

    /// Whether `follower_id` follows `following_id`.
    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        self.follow_repo
            .is_following(follower_id, following_id)
            .await
    }

    /// IDs of users the given user follows.
    pub async fn following_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .follow_repo
            .find_following(user_id)
            .await?
            .into_iter()
            .map(|f| f.following_id)
            .collect())
    }

    /// Users the given user follows, newest edge first.
    pub async fn list_following(&self, user_id: &str) -> AppResult<Vec<FollowView>> {
        let edges = self.follow_repo.find_following(user_id).await?;
        self.views(edges.into_iter().map(|f| (f.following_id, f.created_at)).collect())
            .await
    }

    /// Users following the given user, newest edge first.
    pub async fn list_followers(&self, user_id: &str) -> AppResult<Vec<FollowView>> {
        let edges = self.follow_repo.find_followers(user_id).await?;
        self.views(edges.into_iter().map(|f| (f.follower_id, f.created_at)).collect())
            .await
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(user_id).await
    }

    /// Count users a user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }

    async fn views(
        &self,
        edges: Vec<(String, chrono::DateTime<chrono::FixedOffset>)>,
    ) -> AppResult<Vec<FollowView>> {
        let ids: Vec<String> = edges.iter().map(|(id, _)| id.clone()).collect();
        let profiles = self.profile_repo.find_by_ids(&ids).await?;

        Ok(edges
            .into_iter()
            .map(|(user_id, followed_at)| {
                let profile = profiles.iter().find(|p| p.id == user_id);
                FollowView {
                    username: display_username(
                        profile.and_then(|p| p.username.as_deref()),
                        &user_id,
                    )
                    .to_string(),
                    avatar_url: profile
                        .map(|p| p.avatar_url.clone())
                        .filter(|url| !url.is_empty()),
                    user_id,
                    followed_at,
                }
            })
            .collect())
    }
}
