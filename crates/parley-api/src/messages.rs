use reqwest::Method;
use tracing::debug;

use parley_types::api::{MessagesResponse, SendMessageRequest};
use parley_types::models::Message;

use crate::client::{ApiClient, dispatch};
use crate::error::{ApiError, SessionError};

/// One-shot history page for a conversation.
pub async fn history(api: &ApiClient, chat_id: &str) -> Result<Vec<Message>, ApiError> {
    let page: MessagesResponse = api.get(&format!("/chats/{}/messages", chat_id)).await?;
    debug!("Fetched {} history messages for {}", page.messages.len(), chat_id);
    Ok(page.messages)
}

/// Post a message through the companion REST relay.
///
/// `relay` is rooted at the live-transport host. The bearer is the
/// credential embedded in the session claims when present, otherwise the
/// raw session token. Nothing is returned: the message comes back over the
/// live stream like everyone else's.
pub async fn relay_send(
    relay: &ApiClient,
    req: &SendMessageRequest,
    guild_id: Option<&str>,
    bearer: Option<&str>,
) -> Result<(), ApiError> {
    let session_token = relay.session().token();
    let token = bearer
        .or(session_token.as_deref())
        .ok_or(SessionError::Missing)?;

    let mut request = relay.with_bearer(Method::POST, "/api/messages", token).json(req);
    if let Some(guild_id) = guild_id {
        request = request.query(&[("guildId", guild_id)]);
    }

    dispatch(request).await?;
    Ok(())
}
