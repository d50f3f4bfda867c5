use reqwest::Method;

use parley_types::api::{ChatNameRequest, ChatResponse, DirectMessagesResponse, GuildChatsResponse};
use parley_types::models::{Chat, DirectMessage, GuildChat};

use crate::client::ApiClient;
use crate::error::ApiError;

pub async fn get_chat(api: &ApiClient, chat_id: &str) -> Result<Chat, ApiError> {
    let resp: ChatResponse = api.get(&format!("/chats/{}", chat_id)).await?;
    Ok(resp.chat)
}

/// Direct-message conversations, most recently active first.
pub async fn direct_messages(api: &ApiClient) -> Result<Vec<DirectMessage>, ApiError> {
    let resp: DirectMessagesResponse = api.get("/chats/dms").await?;
    let mut chats = resp.chats;
    chats.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    Ok(chats)
}

pub async fn guild_chats(api: &ApiClient, guild_id: &str) -> Result<Vec<GuildChat>, ApiError> {
    let resp: GuildChatsResponse = api.get(&format!("/chats/guild/{}", guild_id)).await?;
    Ok(resp.chats)
}

pub async fn create_guild_chat(api: &ApiClient, guild_id: &str, chat_name: &str) -> Result<(), ApiError> {
    let body = ChatNameRequest {
        chat_name: chat_name.to_string(),
    };
    api.send(Method::POST, &format!("/guilds/{}/chat", guild_id), &body).await
}

pub async fn rename_guild_chat(
    api: &ApiClient,
    guild_id: &str,
    chat_id: &str,
    chat_name: &str,
) -> Result<(), ApiError> {
    let body = ChatNameRequest {
        chat_name: chat_name.to_string(),
    };
    api.send(Method::PATCH, &format!("/guilds/{}/chats/{}", guild_id, chat_id), &body)
        .await
}

pub async fn delete_guild_chat(api: &ApiClient, guild_id: &str, chat_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/guilds/{}/chats/{}", guild_id, chat_id))
        .await
}
