//! Comment service.

use chrono::{DateTime, FixedOffset, Utc};
use orbit_common::{AppError, AppResult, IdGenerator};
use orbit_db::{
    entities::comment,
    repositories::{CommentRepository, PostRepository, ProfileRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::dispatch::{NotificationDispatcher, NotificationJob};
use crate::services::post::{comment_content, ensure_owner_or_admin};
use crate::services::profile::display_username;
use crate::services::session::SessionContext;

/// Input for commenting on a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(custom(function = "comment_content"))]
    pub content: String,
}

/// A comment with its author resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<FixedOffset>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    profile_repo: ProfileRepository,
    dispatcher: Option<NotificationDispatcher>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        profile_repo: ProfileRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            profile_repo,
            dispatcher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification dispatcher.
    pub fn set_dispatcher(&mut self, dispatcher: NotificationDispatcher) {
        self.dispatcher = Some(dispatcher);
    }

    /// Comment on a post.
    pub async fn add_comment(
        &self,
        author_id: &str,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author_id.to_string()),
            content: Set(input.content.trim().to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;
        self.post_repo.increment_comment_count(post_id).await?;

        if author_id != post.author_id
            && let Some(ref dispatcher) = self.dispatcher
        {
            dispatcher.enqueue(NotificationJob::comment(
                author_id,
                &post.author_id,
                post_id,
            ));
        }

        Ok(created)
    }

    /// Active comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_active_by_post(post_id).await?;

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.profile_repo.find_by_ids(&author_ids).await?;

        Ok(comments
            .into_iter()
            .map(|c| {
                let author = authors.iter().find(|a| a.id == c.author_id);
                CommentView {
                    author_username: display_username(
                        author.and_then(|a| a.username.as_deref()),
                        &c.author_id,
                    )
                    .to_string(),
                    author_avatar_url: author
                        .map(|a| a.avatar_url.clone())
                        .filter(|url| !url.is_empty()),
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    content: c.content,
                    created_at: c.created_at,
                }
            })
            .collect())
    }

    /// Hide a comment. Only its author or an admin may do this.
    pub async fn deactivate_comment(&self, session: &SessionContext, id: &str) -> AppResult<()> {
        let comment = self
            .comment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {id}")))?;
        ensure_owner_or_admin(session, &comment.author_id)?;

        if self.comment_repo.deactivate(id).await? > 0 {
            self.post_repo
                .decrement_comment_count(&comment.post_id)
                .await?;
        }
        Ok(())
    }
}
