// ABOUTME: Notification dispatch boundary between the workflow and email delivery
// ABOUTME: Fire-and-forget; a failed notification never rolls back a transition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// What happened to a ticket. Payload stays loosely typed; the delivery
/// subsystem renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    TicketAssigned,
    TicketRejected,
    TicketReopened,
    TicketClosed,
    ReportFiled,
    DeadlineApproaching,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub ticket_id: i64,
    pub recipient_email: String,
    pub payload: serde_json::Value,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, ticket_id: i64, recipient_email: impl Into<String>) -> Self {
        Self {
            kind,
            ticket_id,
            recipient_email: recipient_email.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Hands workflow events to the email subsystem. Implementations must not
/// return errors to the caller; delivery problems are their own to log.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

/// Dispatcher that records events to the log stream only. Stands in until a
/// real delivery backend is wired up, and doubles as the silent default.
#[derive(Debug, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn notify(&self, event: NotificationEvent) {
        info!(
            kind = ?event.kind,
            ticket_id = event.ticket_id,
            recipient = %event.recipient_email,
            "Dispatching notification"
        );
    }
}

/// Swallows everything.
#[derive(Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn notify(&self, _event: NotificationEvent) {}
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use std::sync::Mutex;

    /// Captures dispatched events for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingDispatcher {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl RecordingDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<NotificationEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn notify(&self, event: NotificationEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::RecordingDispatcher;
    use super::*;

    #[tokio::test]
    async fn test_recording_dispatcher_captures_events() {
        let dispatcher = RecordingDispatcher::new();

        dispatcher
            .notify(
                NotificationEvent::new(EventKind::TicketRejected, 1, "marie@exemple.fr")
                    .with_payload(serde_json::json!({"reason": "hors périmètre"})),
            )
            .await;

        let events = dispatcher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::TicketRejected);
        assert_eq!(events[0].recipient_email, "marie@exemple.fr");
    }
}
