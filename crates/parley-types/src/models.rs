use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, UserId};

/// Fallback label when a message carries neither a name nor a username.
pub const UNKNOWN_USER: &str = "Unknown User";

/// A chat message as displayed in a transcript.
///
/// History pages and live events both decode into this shape. Messages
/// without `created_at` were delivered live and are rendered as "just sent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: UserId,
    pub content: String,
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

impl Message {
    /// Display label: name, then username, then "Unknown User".
    /// Empty strings count as absent.
    pub fn display_name(&self) -> &str {
        non_empty(self.sender_name.as_deref())
            .or_else(|| non_empty(self.sender_username.as_deref()))
            .unwrap_or(UNKNOWN_USER)
    }

    /// Avatar letter derived from name or username, `'U'` when neither is set.
    pub fn initial(&self) -> char {
        non_empty(self.sender_name.as_deref())
            .or_else(|| non_empty(self.sender_username.as_deref()))
            .and_then(|label| label.chars().next())
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }

    pub fn is_just_sent(&self) -> bool {
        self.created_at.is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Conversation header returned by `GET /chats/{chatId}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Entry of the direct-message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub chat_id: ChatId,
    pub other_username: String,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

/// A text channel inside a guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildChat {
    pub chat_id: ChatId,
    pub chat_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub guild_name: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: String,
    pub role_name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(name: Option<&str>, username: Option<&str>) -> Message {
        Message {
            sender_id: "u1".into(),
            content: "hi".into(),
            chat_id: "c1".into(),
            sender_name: name.map(Into::into),
            sender_username: username.map(Into::into),
            message_id: None,
            created_at: None,
        }
    }

    #[test]
    fn display_name_fallback_chain() {
        assert_eq!(message(Some("Ada"), Some("ada99")).display_name(), "Ada");
        assert_eq!(message(None, Some("ada99")).display_name(), "ada99");
        assert_eq!(message(Some(""), Some("ada99")).display_name(), "ada99");
        assert_eq!(message(None, None).display_name(), UNKNOWN_USER);
    }

    #[test]
    fn initial_is_uppercased() {
        assert_eq!(message(None, Some("bob")).initial(), 'B');
        assert_eq!(message(None, None).initial(), 'U');
    }

    #[test]
    fn history_message_decodes_camel_case() {
        let json = r#"{
            "senderId": "u7",
            "content": "hello",
            "chatId": "general",
            "senderUsername": "neo",
            "messageId": "m1",
            "createdAt": "2024-05-01T10:00:00.000Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender_id, "u7");
        assert_eq!(msg.message_id.as_deref(), Some("m1"));
        assert!(!msg.is_just_sent());
        assert_eq!(msg.display_name(), "neo");
    }
}
