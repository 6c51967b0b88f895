//! Real-time notification fan-out.

use murmur_core::Document;
use serde::Serialize;
use tokio::sync::broadcast;

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventKind {
    Created,
    Read,
}

/// A notification change delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub kind: NotificationEventKind,
    /// Account id the notification is addressed to.
    pub receiver: String,
    pub notification: Document,
}

impl NotificationEvent {
    /// Build an event from a stored notification.
    pub fn new(kind: NotificationEventKind, notification: Document) -> Self {
        let receiver = notification
            .get("receiver")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            receiver,
            notification,
        }
    }
}

/// Sink for notification events.
pub trait NotificationPublisher: Send + Sync {
    /// Publish an event. Delivery is best effort.
    fn publish(&self, event: &NotificationEvent);
}

/// Publisher backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<NotificationEvent>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationPublisher for BroadcastPublisher {
    fn publish(&self, event: &NotificationEvent) {
        match self.sender.send(event.clone()) {
            Ok(delivered) => {
                tracing::debug!(
                    receiver = %event.receiver,
                    kind = ?event.kind,
                    delivered,
                    "notification published"
                );
            }
            Err(_) => {
                tracing::trace!(receiver = %event.receiver, "no notification subscribers");
            }
        }
    }
}
