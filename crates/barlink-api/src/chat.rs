use axum::Json;
use axum::extract::State;
use tracing::info;

use barlink_types::api::{
    ConversationRequest, GroupResponse, MarkReadResponse, MessageResponse, SendMessageRequest,
};
use barlink_types::conversation::ConversationKey;
use barlink_types::events::NotificationEvent;

use crate::error::{ApiError, join_error, require};
use crate::state::AppState;

/// Persist a chat message and notify the conversation's subscribers.
///
/// The conversation key is always derived here from the two participants;
/// a pre-computed group name from the client is never accepted, since the
/// key doubles as the notification routing target.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = require(req.user, "user")?;
    let other_user = require(req.other_user, "otherUser")?;
    let message = require(req.message, "message")?;
    let timestamp = req
        .timestamp
        .ok_or_else(|| ApiError::invalid("missing required field 'timestamp'"))?;

    let key = ConversationKey::derive(&user, &other_user)?;
    info!("sending message in conversation {key}");

    // Run the blocking table insert off the async runtime
    let messages = state.messages.clone();
    let record = {
        let (key, user, message) = (key.clone(), user.clone(), message.clone());
        tokio::task::spawn_blocking(move || messages.append(&key, &user, &message, timestamp))
            .await
            .map_err(join_error)??
    };

    state.dispatcher.publish(
        NotificationEvent::receive_message_target(&key),
        vec![
            user.into(),
            other_user.into(),
            message.into(),
            timestamp.into(),
        ],
    );

    Ok(Json(MessageResponse {
        conversation_key: record.conversation_key,
        message_id: record.message_id,
        sender: record.sender,
        message: record.body,
        sent_at: record.sent_at,
        is_read: record.is_read,
    }))
}

/// Flip the unread flag on every message the other participant sent.
/// Responds with how many records were updated; partial success still
/// reports the count that went through.
pub async fn mark_read(
    State(state): State<AppState>,
    Json(req): Json<ConversationRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let user = require(req.user, "user")?;
    let other_user = require(req.other_user, "otherUser")?;

    let key = ConversationKey::derive(&user, &other_user)?;

    let messages = state.messages.clone();
    let updated = {
        let key = key.clone();
        tokio::task::spawn_blocking(move || messages.mark_conversation_read(&key, &user))
            .await
            .map_err(join_error)??
    };

    info!("marked {updated} messages read in conversation {key}");
    Ok(Json(MarkReadResponse { updated }))
}

/// The gateway group a client should subscribe to for this conversation.
pub async fn conversation_group(
    Json(req): Json<ConversationRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let user = require(req.user, "user")?;
    let other_user = require(req.other_user, "otherUser")?;

    let key = ConversationKey::derive(&user, &other_user)?;
    Ok(Json(GroupResponse {
        group: key.to_string(),
    }))
}
