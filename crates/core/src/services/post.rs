//! Post service.

use chrono::{DateTime, FixedOffset, Utc};
use orbit_common::{AppError, AppResult, IdGenerator};
use orbit_db::{
    entities::{post, post::PostCategory, profile},
    repositories::{
        CommentRepository, FollowRepository, LikeRepository, PostRepository, ProfileRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::services::profile::display_username;
use crate::services::session::SessionContext;

/// Longest post body, counted after trimming.
pub(crate) const MAX_POST_CHARS: usize = 280;

/// Longest comment body, counted after trimming.
pub(crate) const MAX_COMMENT_CHARS: usize = 200;

/// Checks the trimmed text is non-empty and at most `max` characters.
fn trimmed_content(value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("blank").with_message("Content cannot be empty".into()));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::new("length")
            .with_message(format!("Content must be at most {max} characters").into()));
    }
    Ok(())
}

pub(crate) fn post_content(value: &str) -> Result<(), ValidationError> {
    trimmed_content(value, MAX_POST_CHARS)
}

pub(crate) fn comment_content(value: &str) -> Result<(), ValidationError> {
    trimmed_content(value, MAX_COMMENT_CHARS)
}

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(custom(function = "post_content"))]
    pub content: String,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    pub category: Option<PostCategory>,
}

/// Input for editing a post.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    #[validate(custom(function = "post_content"))]
    pub content: Option<String>,
    pub category: Option<PostCategory>,
}

/// A post with its author resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub category: PostCategory,
    pub like_count: i32,
    pub comment_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl PostView {
    /// Attach an author. Without a username the raw author ID is shown.
    #[must_use]
    pub fn new(post: post::Model, author: Option<&profile::Model>) -> Self {
        Self {
            author_username: display_username(
                author.and_then(|a| a.username.as_deref()),
                &post.author_id,
            )
            .to_string(),
            author_avatar_url: author
                .map(|a| a.avatar_url.clone())
                .filter(|url| !url.is_empty()),
            id: post.id,
            author_id: post.author_id,
            content: post.content,
            image_url: post.image_url,
            category: post.category,
            like_count: post.like_count,
            comment_count: post.comment_count,
            is_active: post.is_active,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Owner or admin check shared by post and comment mutations.
pub(crate) fn ensure_owner_or_admin(session: &SessionContext, owner_id: &str) -> AppResult<()> {
    if session.user_id() == owner_id || session.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author or an admin can do that".to_string(),
        ))
    }
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    profile_repo: ProfileRepository,
    follow_repo: FollowRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        profile_repo: ProfileRepository,
        follow_repo: FollowRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            post_repo,
            profile_repo,
            follow_repo,
            like_repo,
            comment_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post.
    pub async fn create_post(
        &self,
        author_id: &str,
        input: CreatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            content: Set(input.content.trim().to_string()),
            image_url: Set(input.image_url.filter(|url| !url.is_empty())),
            category: Set(input.category.unwrap_or_default()),
            like_count: Set(0),
            comment_count: Set(0),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.post_repo.create(model).await?;
        tracing::debug!(post_id = %created.id, author_id = %author_id, "Created post");
        Ok(created)
    }

    /// Get a post with its author.
    pub async fn get_post(&self, id: &str) -> AppResult<PostView> {
        let post = self.post_repo.get_by_id(id).await?;
        let author = self.profile_repo.find_by_id(&post.author_id).await?;
        Ok(PostView::new(post, author.as_ref()))
    }

    /// Edit a post. Only the author or an admin may do this.
    pub async fn update_post(
        &self,
        session: &SessionContext,
        id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        let existing = self.post_repo.get_by_id(id).await?;
        ensure_owner_or_admin(session, &existing.author_id)?;

        let mut active: post::ActiveModel = existing.into();
        if let Some(content) = input.content {
            active.content = Set(content.trim().to_string());
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.post_repo.update(active).await
    }

    /// Delete a post. Only the author or an admin may do this.
    pub async fn delete_post(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        ensure_owner_or_admin(session, &post.author_id)?;
        self.remove(id).await
    }

    /// Delete notifications referencing the post, then the post itself.
    ///
    /// Comment and like rows are left in place.
    pub(crate) async fn remove(&self, id: &str) -> AppResult<()> {
        let notifications = self
            .post_repo
            .delete_with_notifications(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))?;

        tracing::info!(post_id = %id, notifications, "Deleted post");
        Ok(())
    }

    /// Recent posts by followed users and the user themself.
    pub async fn list_feed(&self, user_id: &str, limit: u64) -> AppResult<Vec<PostView>> {
        let mut authors: Vec<String> = self
            .follow_repo
            .find_following(user_id)
            .await?
            .into_iter()
            .map(|f| f.following_id)
            .collect();
        authors.push(user_id.to_string());

        let posts = self.post_repo.find_active_by_authors(&authors, limit).await?;
        self.attach_authors(posts).await
    }

    /// Recent posts regardless of the follow graph.
    pub async fn list_explore(&self, limit: u64) -> AppResult<Vec<PostView>> {
        let posts = self.post_repo.find_recent_active(limit).await?;
        self.attach_authors(posts).await
    }

    /// All posts by an author, newest first.
    pub async fn list_by_author(&self, author_id: &str) -> AppResult<Vec<PostView>> {
        let posts = self.post_repo.find_by_author(author_id).await?;
        self.attach_authors(posts).await
    }

    /// All posts, active or not, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<PostView>> {
        let posts = self.post_repo.find_all_newest().await?;
        self.attach_authors(posts).await
    }

    /// Count all posts.
    pub async fn count(&self) -> AppResult<u64> {
        self.post_repo.count().await
    }

    /// Count posts created at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<FixedOffset>) -> AppResult<u64> {
        self.post_repo.count_created_since(since).await
    }

    /// Recompute both counters from the like and comment tables.
    pub async fn reconcile_counters(&self, id: &str) -> AppResult<post::Model> {
        let likes = self.like_repo.count_by_post(id).await?;
        let comments = self.comment_repo.count_active_by_post(id).await?;

        self.post_repo
            .set_counters(
                id,
                i32::try_from(likes).unwrap_or(i32::MAX),
                i32::try_from(comments).unwrap_or(i32::MAX),
            )
            .await?;

        tracing::info!(post_id = %id, likes, comments, "Reconciled post counters");
        self.post_repo.get_by_id(id).await
    }

    async fn attach_authors(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostView>> {
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.profile_repo.find_by_ids(&author_ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| {
                let author = authors.iter().find(|a| a.id == post.author_id);
                PostView::new(post, author)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        count_row, empty_db, exec, make_admin_profile, make_follow, make_post, make_profile,
        make_session,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    struct Dbs {
        post: Arc<DatabaseConnection>,
        profile: Arc<DatabaseConnection>,
        follow: Arc<DatabaseConnection>,
        like: Arc<DatabaseConnection>,
        comment: Arc<DatabaseConnection>,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                post: empty_db(),
                profile: empty_db(),
                follow: empty_db(),
                like: empty_db(),
                comment: empty_db(),
            }
        }
    }

    fn conn(db: MockDatabase) -> Arc<DatabaseConnection> {
        Arc::new(db.into_connection())
    }

    fn service(dbs: &Dbs) -> PostService {
        PostService::new(
            PostRepository::new(dbs.post.clone()),
            ProfileRepository::new(dbs.profile.clone()),
            FollowRepository::new(dbs.follow.clone()),
            LikeRepository::new(dbs.like.clone()),
            CommentRepository::new(dbs.comment.clone()),
        )
    }

    fn log(db: Arc<DatabaseConnection>) -> Vec<String> {
        Arc::try_unwrap(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .map(|t| format!("{t:?}"))
            .collect()
    }

    #[tokio::test]
    async fn test_create_post_rejects_blank_and_long_content() {
        let service = service(&Dbs::default());

        let blank = service
            .create_post(
                "alice",
                CreatePostInput {
                    content: "   ".to_string(),
                    image_url: None,
                    category: None,
                },
            )
            .await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let long = service
            .create_post(
                "alice",
                CreatePostInput {
                    content: "x".repeat(281),
                    image_url: None,
                    category: None,
                },
            )
            .await;
        assert!(matches!(long, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_content_limit_ignores_surrounding_whitespace() {
        let padded = CreatePostInput {
            content: format!("  {}\n", "x".repeat(MAX_POST_CHARS)),
            image_url: None,
            category: None,
        };
        assert!(padded.validate().is_ok());

        let edit = UpdatePostInput {
            content: Some(format!("{}   ", "y".repeat(MAX_POST_CHARS))),
            category: None,
        };
        assert!(edit.validate().is_ok());

        let too_long = UpdatePostInput {
            content: Some(format!(" {} ", "y".repeat(MAX_POST_CHARS + 1))),
            category: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_post_defaults_to_general() {
        let dbs = Dbs {
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_post("p1", "alice", "hello world")]]),
            ),
            ..Default::default()
        };

        let post = service(&dbs)
            .create_post(
                "alice",
                CreatePostInput {
                    content: "hello world".to_string(),
                    image_url: None,
                    category: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(post.category, PostCategory::General);
        assert_eq!(post.like_count, 0);
    }

    #[tokio::test]
    async fn test_feed_includes_followed_and_own_posts() {
        let dbs = Dbs {
            follow: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_follow("alice", "bob")]]),
            ),
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                    make_post("p2", "bob", "second"),
                    make_post("p1", "alice", "first"),
                ]]),
            ),
            profile: conn(
                MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                    make_profile("alice", Some("alice")),
                    make_profile("bob", None),
                ]]),
            ),
            ..Default::default()
        };

        let feed = service(&dbs).list_feed("alice", 20).await.unwrap();

        assert_eq!(feed.len(), 2);
        // No username: the author ID is shown.
        assert_eq!(feed[0].author_username, "bob");
        assert_eq!(feed[1].author_username, "alice");

        drop(dbs.follow);
        drop(dbs.profile);
        let post_log = log(dbs.post);
        assert!(post_log[0].contains("alice"));
        assert!(post_log[0].contains("bob"));
    }

    #[tokio::test]
    async fn test_author_without_username_shows_id() {
        let view = PostView::new(
            make_post("p1", "0f8c2d1e", "hi"),
            Some(&make_profile("0f8c2d1e", None)),
        );
        assert_eq!(view.author_username, "0f8c2d1e");

        let orphan = PostView::new(make_post("p2", "gone", "hi"), None);
        assert_eq!(orphan.author_username, "gone");
    }

    #[tokio::test]
    async fn test_delete_post_removes_notifications_first() {
        let dbs = Dbs {
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_post("p1", "alice", "hello")]])
                    .append_query_results([[make_post("p1", "alice", "hello")]])
                    .append_exec_results([exec(2), exec(1)]),
            ),
            ..Default::default()
        };
        let session = make_session(make_profile("alice", Some("alice")));

        service(&dbs).delete_post(&session, "p1").await.unwrap();

        let post_log = log(dbs.post).join("\n");
        let lock = post_log.find("FOR UPDATE").unwrap();
        let deletes: Vec<usize> = post_log.match_indices("DELETE").map(|(i, _)| i).collect();
        assert_eq!(deletes.len(), 2);
        assert!(lock < deletes[0]);
        assert!(post_log[deletes[0]..deletes[1]].contains("notifications"));

        assert!(log(dbs.like).is_empty());
        assert!(log(dbs.comment).is_empty());
    }

    #[tokio::test]
    async fn test_delete_post_gone_before_lock() {
        let dbs = Dbs {
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_post("p1", "alice", "hello")]])
                    .append_query_results([Vec::<post::Model>::new()]),
            ),
            ..Default::default()
        };
        let session = make_session(make_profile("alice", Some("alice")));

        let result = service(&dbs).delete_post(&session, "p1").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
        assert!(log(dbs.post).iter().all(|s| !s.contains("DELETE")));
    }

    #[tokio::test]
    async fn test_delete_post_forbidden_for_other_users() {
        let dbs = Dbs {
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_post("p1", "alice", "hello")]]),
            ),
            ..Default::default()
        };
        let session = make_session(make_profile("bob", Some("bob")));

        let result = service(&dbs).delete_post(&session, "p1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_may_edit_any_post() {
        let mut edited = make_post("p1", "alice", "edited");
        edited.category = PostCategory::Announcement;
        let dbs = Dbs {
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[make_post("p1", "alice", "hello")]])
                    .append_query_results([[edited]]),
            ),
            ..Default::default()
        };
        let session = make_session(make_admin_profile("root"));

        let post = service(&dbs)
            .update_post(
                &session,
                "p1",
                UpdatePostInput {
                    content: Some("edited".to_string()),
                    category: Some(PostCategory::Announcement),
                },
            )
            .await
            .unwrap();

        assert_eq!(post.category, PostCategory::Announcement);
    }

    #[tokio::test]
    async fn test_reconcile_counters() {
        let mut repaired = make_post("p1", "alice", "hello");
        repaired.like_count = 3;
        repaired.comment_count = 2;
        let dbs = Dbs {
            like: conn(
                MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[count_row(3)]]),
            ),
            comment: conn(
                MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[count_row(2)]]),
            ),
            post: conn(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_exec_results([exec(1)])
                    .append_query_results([[repaired]]),
            ),
            ..Default::default()
        };

        let post = service(&dbs).reconcile_counters("p1").await.unwrap();

        assert_eq!((post.like_count, post.comment_count), (3, 2));
        drop(dbs.like);
        drop(dbs.comment);
        let post_log = log(dbs.post);
        assert!(post_log[0].contains("UPDATE"));
        assert!(post_log[0].contains("like_count"));
        assert!(post_log[0].contains("comment_count"));
    }
}
