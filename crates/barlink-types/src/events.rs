use serde::{Deserialize, Serialize};

use crate::conversation::ConversationKey;

/// Target name for a new chat message, suffixed with the conversation key.
pub const RECEIVE_MESSAGE_PREFIX: &str = "ReceiveMessage_";

/// Target name published when a user claims a seat. Arguments: [seat, user].
pub const CONNECT_SEAT_TARGET: &str = "connectSeat";

/// Target name published when a seat is released. Arguments: [seat].
pub const DISCONNECT_SEAT_TARGET: &str = "disconnectSeat";

/// Envelope delivered to gateway clients: a named client-side handler plus
/// positional arguments. Transient, never persisted; at-most-once per
/// publish, best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub target: String,
    pub arguments: Vec<serde_json::Value>,
}

impl NotificationEvent {
    pub fn new(target: impl Into<String>, arguments: Vec<serde_json::Value>) -> Self {
        Self {
            target: target.into(),
            arguments,
        }
    }

    /// Target for a message in the given conversation.
    pub fn receive_message_target(key: &ConversationKey) -> String {
        format!("{RECEIVE_MESSAGE_PREFIX}{key}")
    }

    /// Returns the conversation group this event is scoped to, if any.
    /// Events that return `None` are global and go to every client.
    pub fn group(&self) -> Option<&str> {
        self.target.strip_prefix(RECEIVE_MESSAGE_PREFIX)
    }
}

/// Commands sent FROM client TO server over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Replace this connection's conversation-group subscriptions.
    /// Conversation-scoped events are only forwarded for subscribed groups;
    /// seat events are global and always delivered.
    Subscribe { groups: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_events_are_conversation_scoped() {
        let key = ConversationKey::derive("alice", "bob").unwrap();
        let event = NotificationEvent::new(
            NotificationEvent::receive_message_target(&key),
            vec!["alice".into(), "bob".into(), "hi".into(), 1000.into()],
        );
        assert_eq!(event.group(), Some("alice;bob"));
    }

    #[test]
    fn seat_events_are_global() {
        let event = NotificationEvent::new(CONNECT_SEAT_TARGET, vec!["seat_3".into(), "alice".into()]);
        assert_eq!(event.group(), None);
    }
}
