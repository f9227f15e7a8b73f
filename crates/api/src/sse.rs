//! Server-Sent Events (SSE) for real-time updates.
//!
//! Two per-user streams: auth state changes and the unread-notification
//! counter.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use orbit_common::AppResult;
use orbit_core::{CounterUpdate, NotificationService, UnreadCounter};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::AuthSession, middleware::AppState};

/// Serialize `data` into a named event.
fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|_| Event::default().event(name).data("error"))
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(30))
        .text("ping")
}

/// Auth state changes of the signed-in user.
pub(crate) async fn auth_events(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = session.user_id().to_string();
    let rx = state.session_service.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        result
            .ok()
            .filter(|event| event.user_id() == user_id)
            .map(|event| Ok::<_, Infallible>(json_event("auth", &event)))
    });

    let initial = stream::once(async move {
        Ok::<_, Infallible>(json_event(
            "auth",
            &json!({ "event": "connected", "userId": session.user_id() }),
        ))
    });

    Sse::new(initial.chain(stream)).keep_alive(keep_alive())
}

struct UnreadStream {
    rx: tokio::sync::broadcast::Receiver<orbit_core::ChangeEvent>,
    counter: UnreadCounter,
    user_id: String,
    notifications: NotificationService,
}

impl UnreadStream {
    async fn refetch(&mut self) {
        match self.notifications.unread_count(&self.user_id).await {
            Ok(count) => self.counter.reset(count),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %self.user_id, "Failed to refetch unread count");
            }
        }
    }

    /// Wait until the counter changes. `None` once the feed is closed.
    async fn next_count(&mut self) -> Option<u64> {
        loop {
            match self.rx.recv().await {
                Ok(event) => match self.counter.observe(&event) {
                    CounterUpdate::Unchanged => {}
                    CounterUpdate::Incremented => return Some(self.counter.count()),
                    CounterUpdate::RefetchRequired => {
                        self.refetch().await;
                        return Some(self.counter.count());
                    }
                },
                // Missed events; only a fresh count is trustworthy.
                Err(RecvError::Lagged(_)) => {
                    self.refetch().await;
                    return Some(self.counter.count());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Live unread-notification count of the signed-in user.
pub(crate) async fn unread_stream(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let user_id = session.user_id().to_string();
    // Subscribe before counting so an insert in between is never missed.
    let rx = state.notification_service.subscribe();
    let initial = state.notification_service.unread_count(&user_id).await?;

    let unread = UnreadStream {
        rx,
        counter: UnreadCounter::new(user_id.clone(), initial),
        user_id,
        notifications: state.notification_service.clone(),
    };

    let updates = stream::unfold(unread, |mut unread| async move {
        let count = unread.next_count().await?;
        let event = json_event("unread", &json!({ "count": count }));
        Some((Ok::<_, Infallible>(event), unread))
    });

    let first = stream::once(async move {
        Ok::<_, Infallible>(json_event("unread", &json!({ "count": initial })))
    });

    Ok(Sse::new(first.chain(updates)).keep_alive(keep_alive()))
}
