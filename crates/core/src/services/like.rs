//! Like service.

use chrono::Utc;
use orbit_common::{AppError, AppResult};
use orbit_db::{
    entities::like,
    is_unique_violation,
    repositories::{LikeRepository, PostRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::dispatch::{NotificationDispatcher, NotificationJob};

/// Like state of a post for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i32,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    post_repo: PostRepository,
    dispatcher: Option<NotificationDispatcher>,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(like_repo: LikeRepository, post_repo: PostRepository) -> Self {
        Self {
            like_repo,
            post_repo,
            dispatcher: None,
        }
    }

    /// Set the notification dispatcher.
    pub fn set_dispatcher(&mut self, dispatcher: NotificationDispatcher) {
        self.dispatcher = Some(dispatcher);
    }

    /// Like a post.
    pub async fn like(&self, user_id: &str, post_id: &str) -> AppResult<LikeState> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if self.like_repo.is_liked(post_id, user_id).await? {
            return Err(AppError::BadRequest("Already liked".to_string()));
        }

        let model = like::ActiveModel {
            post_id: Set(post_id.to_string()),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        match self.like_repo.create(model).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::BadRequest("Already liked".to_string()));
            }
            Err(e) => return Err(e),
        }

        self.post_repo.increment_like_count(post_id).await?;

        if user_id != post.author_id
            && let Some(ref dispatcher) = self.dispatcher
        {
            dispatcher.enqueue(NotificationJob::like(user_id, &post.author_id, post_id));
        }

        let updated = self.post_repo.get_by_id(post_id).await?;
        Ok(LikeState {
            liked: true,
            like_count: updated.like_count,
        })
    }

    /// Remove a like. Succeeds whether or not the like existed.
    pub async fn unlike(&self, user_id: &str, post_id: &str) -> AppResult<LikeState> {
        let removed = self.like_repo.delete_by_pair(post_id, user_id).await?;
        if removed > 0 {
            self.post_repo.decrement_like_count(post_id).await?;
        }

        let like_count = self
            .post_repo
            .find_by_id(post_id)
            .await?
            .map_or(0, |p| p.like_count);

        Ok(LikeState {
            liked: false,
            like_count,
        })
    }

    /// Whether the user has liked the post.
    pub async fn is_liked(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        self.like_repo.is_liked(post_id, user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{exec, make_like, make_post};
    use orbit_db::entities::post;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn post_with_likes(author: &str, likes: i32) -> post::Model {
        let mut post = make_post("p1", author, "hello");
        post.like_count = likes;
        post
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
    async fn test_like_increments_count_and_notifies_author() {
        let like_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<like::Model>::new()])
                .append_query_results([[make_like("p1", "bob")]])
                .into_connection(),
        );
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post_with_likes("alice", 4)]])
                .append_exec_results([exec(1)])
                .append_query_results([[post_with_likes("alice", 5)]])
                .into_connection(),
        );
        let mut service = LikeService::new(
            LikeRepository::new(like_db.clone()),
            PostRepository::new(post_db.clone()),
        );
        let (dispatcher, mut rx) = NotificationDispatcher::channel(8);
        service.set_dispatcher(dispatcher);

        let state = service.like("bob", "p1").await.unwrap();

        assert_eq!(
            state,
            LikeState {
                liked: true,
                like_count: 5
            }
        );
        let job = rx.recv().await.unwrap();
        assert_eq!(job.recipient_id, "alice");
        assert_eq!(job.message, "liked your post");

        drop(service);
        let like_log = log(like_db);
        assert!(like_log[1].contains("INSERT"));
        let post_log = log(post_db);
        assert!(post_log[1].contains("like_count"));
        assert!(post_log[1].contains(" + "));
    }

    #[tokio::test]
    async fn test_like_own_post_does_not_notify() {
        let like_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<like::Model>::new()])
            .append_query_results([[make_like("p1", "alice")]]);
        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[post_with_likes("alice", 0)]])
            .append_exec_results([exec(1)])
            .append_query_results([[post_with_likes("alice", 1)]]);
        let mut service = LikeService::new(
            LikeRepository::new(Arc::new(like_db.into_connection())),
            PostRepository::new(Arc::new(post_db.into_connection())),
        );
        let (dispatcher, mut rx) = NotificationDispatcher::channel(8);
        service.set_dispatcher(dispatcher);

        service.like("alice", "p1").await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_like_twice_is_rejected() {
        let like_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[make_like("p1", "bob")]]);
        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[post_with_likes("alice", 1)]]);
        let service = LikeService::new(
            LikeRepository::new(Arc::new(like_db.into_connection())),
            PostRepository::new(Arc::new(post_db.into_connection())),
        );

        let result = service.like("bob", "p1").await;

        assert!(matches!(result, Err(AppError::BadRequest(ref msg)) if msg == "Already liked"));
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let post_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()]);
        let service = LikeService::new(
            LikeRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            PostRepository::new(Arc::new(post_db.into_connection())),
        );

        let result = service.like("bob", "gone").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_unlike_decrements_with_floor() {
        let like_db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(1)]);
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[post_with_likes("alice", 4)]])
                .into_connection(),
        );
        let service = LikeService::new(
            LikeRepository::new(Arc::new(like_db.into_connection())),
            PostRepository::new(post_db.clone()),
        );

        let state = service.unlike("bob", "p1").await.unwrap();

        assert_eq!(state.like_count, 4);
        assert!(!state.liked);
        drop(service);
        let post_log = log(post_db);
        assert!(post_log[0].contains("GREATEST(like_count - 1, 0)"));
    }

    #[tokio::test]
    async fn test_unlike_without_like_leaves_counter() {
        let like_db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(0)]);
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post_with_likes("alice", 2)]])
                .into_connection(),
        );
        let service = LikeService::new(
            LikeRepository::new(Arc::new(like_db.into_connection())),
            PostRepository::new(post_db.clone()),
        );

        let state = service.unlike("bob", "p1").await.unwrap();

        assert_eq!(state.like_count, 2);
        drop(service);
        let post_log = log(post_db);
        assert_eq!(post_log.len(), 1);
        assert!(post_log[0].contains("SELECT"));
    }
}
