//! Admin dashboard service.
//!
//! Every operation takes the caller's session and refuses non-admins.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use orbit_common::{AppError, AppResult};
use orbit_db::entities::post::{self, PostCategory};
use serde::Serialize;

use crate::services::post::{PostService, PostView};
use crate::services::profile::{NO_USERNAME, ProfileService, display_username};
use crate::services::session::SessionContext;

/// Site-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub posts: u64,
    /// Posts created since 00:00 UTC today.
    pub posts_today: u64,
}

/// A row of the user table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// A row of the post table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostView {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub category: PostCategory,
    pub is_active: bool,
    pub like_count: i32,
    pub comment_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<PostView> for AdminPostView {
    fn from(view: PostView) -> Self {
        Self {
            id: view.id,
            author_id: view.author_id,
            author_username: view.author_username,
            content: view.content,
            category: view.category,
            is_active: view.is_active,
            like_count: view.like_count,
            comment_count: view.comment_count,
            created_at: view.created_at,
        }
    }
}

/// Admin service for business logic.
#[derive(Clone)]
pub struct AdminService {
    profiles: ProfileService,
    posts: PostService,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(profiles: ProfileService, posts: PostService) -> Self {
        Self { profiles, posts }
    }

    /// Refuse callers without the admin flag.
    pub fn ensure_admin(session: &SessionContext) -> AppResult<()> {
        if session.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Dashboard totals.
    pub async fn dashboard(&self, session: &SessionContext) -> AppResult<AdminStats> {
        Self::ensure_admin(session)?;

        let midnight = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .fixed_offset();

        Ok(AdminStats {
            users: self.profiles.count().await?,
            posts: self.posts.count().await?,
            posts_today: self.posts.count_created_since(midnight).await?,
        })
    }

    /// All profiles, newest first.
    pub async fn list_users(&self, session: &SessionContext) -> AppResult<Vec<AdminUserView>> {
        Self::ensure_admin(session)?;

        Ok(self
            .profiles
            .list_all()
            .await?
            .into_iter()
            .map(|p| AdminUserView {
                username: display_username(p.username.as_deref(), NO_USERNAME).to_string(),
                avatar_url: Some(p.avatar_url).filter(|url| !url.is_empty()),
                id: p.id,
                is_admin: p.is_admin,
                created_at: p.created_at,
            })
            .collect())
    }

    /// Delete a profile row.
    pub async fn delete_user(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        Self::ensure_admin(session)?;

        self.profiles.delete(id).await?;
        tracing::info!(admin_id = %session.user_id(), user_id = %id, "Admin deleted user");
        Ok(())
    }

    /// All posts, active or not, newest first.
    pub async fn list_posts(&self, session: &SessionContext) -> AppResult<Vec<AdminPostView>> {
        Self::ensure_admin(session)?;

        Ok(self
            .posts
            .list_all()
            .await?
            .into_iter()
            .map(AdminPostView::from)
            .collect())
    }

    /// Delete any post.
    pub async fn delete_post(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        Self::ensure_admin(session)?;

        self.posts.remove(id).await?;
        tracing::info!(admin_id = %session.user_id(), post_id = %id, "Admin deleted post");
        Ok(())
    }

    /// Recount a post's likes and active comments and store the result.
    pub async fn reconcile_post(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> AppResult<post::Model> {
        Self::ensure_admin(session)?;

        self.posts.reconcile_counters(id).await
    }
}
