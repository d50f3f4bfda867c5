use serde::{Deserialize, Serialize};

use crate::models::{
    Ban, Chat, DirectMessage, Friend, FriendRequest, Guild, GuildChat, Member, Message, Role,
};
use crate::{ChatId, UserId};

// -- Session token claims --

/// Claims carried by the session token. The client never verifies the
/// signature; it only reads identity out of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    /// Credential embedded for the live transport and message relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }
}

// -- Auth --

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Messages --

/// Body of the companion REST send endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub chat: Chat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectMessagesResponse {
    #[serde(default)]
    pub chats: Vec<DirectMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildChatsResponse {
    #[serde(default)]
    pub chats: Vec<GuildChat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatNameRequest {
    pub chat_name: String,
}

// -- Guilds --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildsResponse {
    #[serde(default)]
    pub guilds: Vec<Guild>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildNameRequest {
    pub guild_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembersResponse {
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BansResponse {
    #[serde(default)]
    pub bans: Vec<Ban>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesResponse {
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub role_name: String,
    pub color: String,
    pub permissions: Vec<String>,
}

// -- Friends --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendsResponse {
    #[serde(default)]
    pub friends: Vec<Friend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendRequestsResponse {
    #[serde(default)]
    pub requests: Vec<FriendRequest>,
}

// -- Permissions --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub permission: String,
    pub allowed: bool,
    #[serde(default)]
    pub granted_by_role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionsResponse {
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

// -- Errors --

/// Structured error body. Collaborators disagree on where the human
/// text lives, so every known field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toxicity_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorField {
    /// Machine-readable code, e.g. `TOXIC_CONTENT`
    Code(String),
    Detail {
        #[serde(default)]
        info: Option<String>,
    },
}

impl ErrorBody {
    pub fn code(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorField::Code(code)) => Some(code),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorField::Detail { info }) => info.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_accepts_both_error_shapes() {
        let toxic: ErrorBody = serde_json::from_str(
            r#"{"error":"TOXIC_CONTENT","message":"Message is toxic","toxicityScore":0.92}"#,
        )
        .unwrap();
        assert_eq!(toxic.code(), Some("TOXIC_CONTENT"));
        assert_eq!(toxic.toxicity_score, Some(0.92));

        let info: ErrorBody = serde_json::from_str(r#"{"error":{"info":"Guild not found"}}"#).unwrap();
        assert_eq!(info.info(), Some("Guild not found"));
        assert_eq!(info.code(), None);
    }

    #[test]
    fn claims_expiry() {
        let claims = Claims {
            user_id: "u1".into(),
            token: None,
            username: None,
            exp: Some(100),
        };
        assert!(claims.is_expired(100));
        assert!(!claims.is_expired(99));
    }
}
