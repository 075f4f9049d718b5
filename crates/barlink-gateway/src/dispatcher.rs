use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use barlink_types::events::NotificationEvent;

/// Publishes named events with positional arguments to every connected
/// gateway client. Fire-and-forget: a publish only guarantees the event was
/// accepted for delivery, never that any client received it. No retry, no
/// ordering across publishes from separate requests.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<NotificationEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to the event stream. Per-connection group filtering happens
    /// in the connection loop, not here.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. A send error only means no client is connected,
    /// which is fine for fire-and-forget delivery.
    pub fn publish(&self, target: impl Into<String>, arguments: Vec<Value>) {
        let event = NotificationEvent::new(target, arguments);
        trace!("publish {} ({} args)", event.target, event.arguments.len());
        let _ = self.inner.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish("connectSeat", vec!["seat_3".into(), "alice".into()]);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.target, "connectSeat");
        assert_eq!(event.arguments, vec![Value::from("seat_3"), Value::from("alice")]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let dispatcher = Dispatcher::new();
        dispatcher.publish("disconnectSeat", vec!["seat_3".into()]);
    }
}
