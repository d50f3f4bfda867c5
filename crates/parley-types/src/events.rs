use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ErrorBody;
use crate::models::Message;
use crate::{ChatId, UserId};

/// Events pushed by the server over the live socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A message was posted to a conversation this connection has joined
    #[serde(rename = "message")]
    Message(MessagePayload),

    /// The server refused a socket-routed command
    #[serde(rename = "error")]
    Error(ErrorBody),
}

impl ServerEvent {
    /// Returns the chat_id if this event is scoped to a conversation.
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            Self::Message(payload) => Some(&payload.chat_id),
            Self::Error(_) => None,
        }
    }
}

/// Wire shape of a live message. The text travels as `message` and is
/// renamed to `content` once it becomes a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub sender_id: UserId,
    pub message: String,
    pub chat_id: ChatId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MessagePayload> for Message {
    fn from(p: MessagePayload) -> Self {
        Message {
            sender_id: p.sender_id,
            content: p.message,
            chat_id: p.chat_id,
            sender_name: p.sender_name,
            sender_username: p.sender_username,
            message_id: p.message_id,
            created_at: p.created_at,
        }
    }
}

/// Commands sent FROM client TO server over the live socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    /// Start routing a conversation's events to this connection
    #[serde(rename = "join:chat", rename_all = "camelCase")]
    JoinChat {
        chat_id: ChatId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },

    /// Stop routing a conversation's events to this connection
    #[serde(rename = "leave:chat", rename_all = "camelCase")]
    LeaveChat { chat_id: ChatId },

    /// Post a message over the socket instead of the REST relay
    #[serde(rename = "send:message", rename_all = "camelCase")]
    SendMessage {
        chat_id: ChatId,
        sender_id: UserId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        guild_id: Option<String>,
    },
}

impl ClientCommand {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::JoinChat { chat_id, .. }
            | Self::LeaveChat { chat_id }
            | Self::SendMessage { chat_id, .. } => chat_id,
        }
    }
}
