//! A mounted conversation: one history page plus the live buffer.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::info;

use parley_api::{ApiClient, ApiError, chats, messages};
use parley_gateway::{ChatSubscription, SendError, merge_transcript};
use parley_types::UserId;
use parley_types::models::{Chat, Message};

use crate::context::AppContext;

pub const JUST_NOW: &str = "Just now";

/// One rendered transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub author: String,
    pub initial: char,
    pub timestamp: String,
    pub content: String,
    /// Sent by the session user.
    pub own: bool,
}

pub struct ConversationView {
    subscription: ChatSubscription,
    api: ApiClient,
    guild_id: Option<String>,
    chat: Chat,
    history: Vec<Message>,
    own_id: Option<UserId>,
}

impl ConversationView {
    /// Join the chat, then fetch its header and history. Live entries that
    /// arrived before the history request went out are covered by the page
    /// and are hidden from this view. Dropping the view leaves the chat.
    pub async fn mount(ctx: &AppContext, chat_id: &str, guild_id: Option<&str>) -> Result<Self, ApiError> {
        let subscription = ctx.manager.subscribe(chat_id);
        let mark = subscription.refetch_mark();

        let chat = chats::get_chat(&ctx.api, chat_id).await?;
        let history = messages::history(&ctx.api, chat_id).await?;
        subscription.clear_through(mark);

        info!("Mounted chat {} with {} history messages", chat_id, history.len());
        Ok(Self {
            subscription,
            api: ctx.api.clone(),
            guild_id: guild_id.map(str::to_string),
            chat,
            history,
            own_id: ctx.session().claims().ok().map(|c| c.user_id),
        })
    }

    pub fn chat_id(&self) -> &str {
        self.subscription.chat_id()
    }

    /// `#name` for named channels.
    pub fn title(&self) -> Option<String> {
        self.chat.name.as_ref().map(|name| format!("#{}", name))
    }

    /// Refetch the history page under the same clear rule as mount.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let mark = self.subscription.refetch_mark();
        let history = messages::history(&self.api, self.chat_id()).await?;
        self.subscription.clear_through(mark);
        self.history = history;
        Ok(())
    }

    pub fn messages(&self) -> Vec<Message> {
        merge_transcript(&self.history, &self.subscription.messages())
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript_at(&Local::now())
    }

    pub fn transcript_at<Tz>(&self, now: &DateTime<Tz>) -> Vec<TranscriptEntry>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.messages()
            .into_iter()
            .map(|m| TranscriptEntry {
                author: m.display_name().to_string(),
                initial: m.initial(),
                timestamp: format_timestamp(m.created_at, now),
                own: self.own_id.as_deref() == Some(m.sender_id.as_str()),
                content: m.content,
            })
            .collect()
    }

    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        self.subscription
            .manager()
            .send_message(self.chat_id(), text, self.guild_id.as_deref())
            .await
    }
}

/// "Just now" without a timestamp, the time alone for today, and the date
/// plus time otherwise. Rendered in `now`'s time zone.
pub fn format_timestamp<Tz>(created_at: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(created_at) = created_at else {
        return JUST_NOW.to_string();
    };

    let local = created_at.with_timezone(&now.timezone());
    if local.date_naive() == now.date_naive() {
        local.format("%-I:%M %p").to_string()
    } else {
        local.format("%b %-d, %-I:%M %p").to_string()
    }
}
