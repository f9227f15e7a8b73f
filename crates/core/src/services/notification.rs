//! Notification service.

use chrono::Utc;
use orbit_common::{AppResult, IdGenerator};
use orbit_db::{
    entities::{notification, notification::NotificationType},
    repositories::{NotificationRepository, ProfileRepository},
};
use sea_orm::Set;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::services::dispatch::NotificationJob;
use crate::services::profile::{UNKNOWN_USER, display_username};
use crate::services::realtime::{ChangeEvent, ChangeFeed};

/// A notification with its sender resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub notification_type: NotificationType,
    pub message: String,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_avatar_url: Option<String>,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    profile_repo: ProfileRepository,
    feed: ChangeFeed,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        profile_repo: ProfileRepository,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            notification_repo,
            profile_repo,
            feed,
            id_gen: IdGenerator::new(),
        }
    }

    /// Insert a notification row and announce it on the change feed.
    pub async fn notify(&self, job: NotificationJob) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(job.recipient_id),
            sender_id: Set(job.sender_id),
            notification_type: Set(job.notification_type),
            post_id: Set(job.post_id),
            message: Set(job.message),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;

        self.feed.publish(ChangeEvent::NotificationCreated {
            id: created.id.clone(),
            recipient_id: created.recipient_id.clone(),
            sender_id: created.sender_id.clone(),
            notification_type: created.notification_type,
            post_id: created.post_id.clone(),
        });

        Ok(created)
    }

    /// Most recent notifications for a user, with sender usernames.
    pub async fn list(&self, user_id: &str, limit: u64) -> AppResult<Vec<NotificationView>> {
        let rows = self
            .notification_repo
            .find_by_recipient(user_id, limit)
            .await?;

        let mut sender_ids: Vec<String> = rows.iter().map(|n| n.sender_id.clone()).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let senders = self.profile_repo.find_by_ids(&sender_ids).await?;

        Ok(rows
            .into_iter()
            .map(|n| {
                let sender = senders.iter().find(|p| p.id == n.sender_id);
                NotificationView {
                    sender_username: display_username(
                        sender.and_then(|p| p.username.as_deref()),
                        UNKNOWN_USER,
                    )
                    .to_string(),
                    sender_avatar_url: sender
                        .map(|p| p.avatar_url.clone())
                        .filter(|url| !url.is_empty()),
                    id: n.id,
                    notification_type: n.notification_type,
                    message: n.message,
                    post_id: n.post_id,
                    is_read: n.is_read,
                    created_at: n.created_at,
                    sender_id: n.sender_id,
                }
            })
            .collect())
    }

    /// Mark every unread notification read. Returns the number of rows changed.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let count = self.notification_repo.mark_all_as_read(user_id).await?;

        self.feed.publish(ChangeEvent::NotificationsRead {
            recipient_id: user_id.to_string(),
            count,
        });

        Ok(count)
    }

    /// Point-in-time unread count.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Subscribe to notification changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::{exec, make_notification, make_profile};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(
        notification_db: MockDatabase,
        profile_db: MockDatabase,
        feed: ChangeFeed,
    ) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(Arc::new(notification_db.into_connection())),
            ProfileRepository::new(Arc::new(profile_db.into_connection())),
            feed,
        )
    }

    #[tokio::test]
    async fn test_notify_publishes_insert() {
        let row = make_notification(
            "n1",
            "alice",
            "bob",
            NotificationType::Comment,
            Some("p1"),
        );
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[row]]),
            MockDatabase::new(DatabaseBackend::Postgres),
            feed,
        );

        let created = service
            .notify(NotificationJob::comment("bob", "alice", "p1"))
            .await
            .unwrap();

        assert_eq!(created.recipient_id, "alice");
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            ChangeEvent::NotificationCreated { ref recipient_id, notification_type: NotificationType::Comment, .. }
                if recipient_id == "alice"
        ));
    }

    #[tokio::test]
    async fn test_list_falls_back_to_unknown_user() {
        let rows = [
            make_notification("n2", "alice", "bob", NotificationType::Like, Some("p1")),
            make_notification("n1", "alice", "ghost", NotificationType::Follow, None),
        ];
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([rows]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[make_profile("bob", Some("bob"))]]),
            ChangeFeed::default(),
        );

        let views = service.list("alice", 50).await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].sender_username, "bob");
        assert_eq!(views[1].sender_username, "Unknown user");
        assert_eq!(views[1].sender_avatar_url, None);
    }

    #[tokio::test]
    async fn test_mark_all_read_publishes_event() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec(3)]),
            MockDatabase::new(DatabaseBackend::Postgres),
            feed,
        );

        assert_eq!(service.mark_all_read("alice").await.unwrap(), 3);
        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeEvent::NotificationsRead {
                recipient_id: "alice".to_string(),
                count: 3
            }
        );
    }
}
