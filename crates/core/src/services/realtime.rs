//! In-process change feed for notification rows.
//!
//! [`ChangeFeed`] broadcasts an event after each notification insert and after
//! each bulk mark-as-read. [`UnreadCounter`] is the badge state a subscriber
//! keeps for one recipient.

use orbit_db::entities::notification::NotificationType;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity; slow subscribers lag and skip events.
const FEED_CAPACITY: usize = 1024;

/// A change to the notifications table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// A notification row was inserted.
    #[serde(rename_all = "camelCase")]
    NotificationCreated {
        id: String,
        recipient_id: String,
        sender_id: String,
        notification_type: NotificationType,
        post_id: Option<String>,
    },
    /// All unread rows of a recipient were marked read.
    #[serde(rename_all = "camelCase")]
    NotificationsRead { recipient_id: String, count: u64 },
}

impl ChangeEvent {
    /// The recipient whose rows changed.
    #[must_use]
    pub fn recipient_id(&self) -> &str {
        match self {
            Self::NotificationCreated { recipient_id, .. }
            | Self::NotificationsRead { recipient_id, .. } => recipient_id,
        }
    }
}

/// Broadcast channel of [`ChangeEvent`]s.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a feed with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all subsequent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

/// What a subscriber should do after observing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The event concerns another recipient.
    Unchanged,
    /// The counter went up by one.
    Incremented,
    /// The recipient's rows were bulk-updated; re-count and [`UnreadCounter::reset`].
    RefetchRequired,
}

/// Unread badge for one recipient.
///
/// Starts from a point-in-time count, goes up by one per observed insert and
/// only goes down through [`Self::reset`] with a fresh count.
#[derive(Debug, Clone)]
pub struct UnreadCounter {
    recipient_id: String,
    count: u64,
}

impl UnreadCounter {
    /// Start from an initial count.
    #[must_use]
    pub const fn new(recipient_id: String, initial: u64) -> Self {
        Self {
            recipient_id,
            count: initial,
        }
    }

    /// Current value.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Apply an event from the feed.
    pub fn observe(&mut self, event: &ChangeEvent) -> CounterUpdate {
        if event.recipient_id() != self.recipient_id {
            return CounterUpdate::Unchanged;
        }
        match event {
            ChangeEvent::NotificationCreated { .. } => {
                self.count = self.count.saturating_add(1);
                CounterUpdate::Incremented
            }
            ChangeEvent::NotificationsRead { .. } => CounterUpdate::RefetchRequired,
        }
    }

    /// Replace the value with a fresh count.
    pub const fn reset(&mut self, count: u64) {
        self.count = count;
    }
}
