//! Background notification dispatch.
//!
//! Follow, like and comment handlers enqueue a [`NotificationJob`] and return
//! without waiting for the insert. A single worker drains the queue. A full
//! queue drops the job; the originating action still succeeds.

use orbit_db::entities::notification::NotificationType;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::notification::NotificationService;

/// A notification waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub recipient_id: String,
    pub sender_id: String,
    pub notification_type: NotificationType,
    pub message: String,
    pub post_id: Option<String>,
}

impl NotificationJob {
    /// `sender` started following `recipient`.
    #[must_use]
    pub fn follow(sender_id: &str, recipient_id: &str) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.to_string(),
            notification_type: NotificationType::Follow,
            message: "started following you".to_string(),
            post_id: None,
        }
    }

    /// `sender` liked a post owned by `recipient`.
    #[must_use]
    pub fn like(sender_id: &str, recipient_id: &str, post_id: &str) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.to_string(),
            notification_type: NotificationType::Like,
            message: "liked your post".to_string(),
            post_id: Some(post_id.to_string()),
        }
    }

    /// `sender` commented on a post owned by `recipient`.
    #[must_use]
    pub fn comment(sender_id: &str, recipient_id: &str, post_id: &str) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.to_string(),
            notification_type: NotificationType::Comment,
            message: "commented on your post".to_string(),
            post_id: Some(post_id.to_string()),
        }
    }
}

/// Result of [`NotificationDispatcher::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    Dropped,
}

/// Sending half of the notification queue.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationJob>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiver a worker should drain.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Create a dispatcher with a worker task writing through `service`.
    #[must_use]
    pub fn spawn(capacity: usize, service: NotificationService) -> (Self, JoinHandle<()>) {
        let (dispatcher, receiver) = Self::channel(capacity);
        let handle = tokio::spawn(run_notification_worker(receiver, service));
        (dispatcher, handle)
    }

    /// Queue a job without waiting.
    pub fn enqueue(&self, job: NotificationJob) -> DispatchOutcome {
        match self.sender.try_send(job) {
            Ok(()) => DispatchOutcome::Queued,
            Err(e) => {
                let job = match &e {
                    mpsc::error::TrySendError::Full(job)
                    | mpsc::error::TrySendError::Closed(job) => job,
                };
                tracing::warn!(
                    error = %e,
                    recipient_id = %job.recipient_id,
                    notification_type = ?job.notification_type,
                    "Dropped notification"
                );
                DispatchOutcome::Dropped
            }
        }
    }
}

/// Drain the queue until every dispatcher is dropped.
pub async fn run_notification_worker(
    mut receiver: mpsc::Receiver<NotificationJob>,
    service: NotificationService,
) {
    tracing::info!("Notification worker started");

    while let Some(job) = receiver.recv().await {
        if let Err(e) = service.notify(job).await {
            tracing::warn!(error = %e, "Failed to create notification");
        }
    }

    tracing::info!("Notification worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_job_messages() {
        let follow = NotificationJob::follow("bob", "alice");
        assert_eq!(follow.message, "started following you");
        assert_eq!(follow.post_id, None);

        let like = NotificationJob::like("bob", "alice", "p1");
        assert_eq!(like.message, "liked your post");
        assert_eq!(like.notification_type, NotificationType::Like);

        let comment = NotificationJob::comment("bob", "alice", "p1");
        assert_eq!(comment.message, "commented on your post");
        assert_eq!(comment.post_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_enqueue_drops_when_full() {
        let (dispatcher, mut rx) = NotificationDispatcher::channel(1);

        assert_eq!(
            dispatcher.enqueue(NotificationJob::follow("bob", "alice")),
            DispatchOutcome::Queued
        );
        assert_eq!(
            dispatcher.enqueue(NotificationJob::follow("carol", "alice")),
            DispatchOutcome::Dropped
        );

        assert_eq!(rx.recv().await.unwrap().sender_id, "bob");
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_gone() {
        let (dispatcher, rx) = NotificationDispatcher::channel(4);
        drop(rx);

        assert_eq!(
            dispatcher.enqueue(NotificationJob::follow("bob", "alice")),
            DispatchOutcome::Dropped
        );
    }
}
