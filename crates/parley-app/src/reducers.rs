//! Pure cache transitions applied after a mutation succeeds.
//!
//! Each reducer takes the old cache by value and returns the new one, so a
//! view can swap its cache in one assignment.

use parley_types::UserId;
use parley_types::models::{Ban, Friend, FriendRequest, Guild, GuildChat, Member, Role};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FriendsCache {
    pub friends: Vec<Friend>,
    pub requests: Vec<FriendRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FriendsEvent {
    RequestAccepted { user_id: UserId },
    RequestRejected { user_id: UserId },
    FriendRemoved { user_id: UserId },
}

pub fn reduce_friends(mut cache: FriendsCache, event: &FriendsEvent) -> FriendsCache {
    match event {
        FriendsEvent::RequestAccepted { user_id } => {
            if let Some(pos) = cache.requests.iter().position(|r| &r.user_id == user_id) {
                let request = cache.requests.remove(pos);
                if !cache.friends.iter().any(|f| &f.user_id == user_id) {
                    cache.friends.push(Friend {
                        user_id: request.user_id,
                        username: request.username,
                        name: request.name,
                    });
                }
            }
        }
        FriendsEvent::RequestRejected { user_id } => {
            cache.requests.retain(|r| &r.user_id != user_id);
        }
        FriendsEvent::FriendRemoved { user_id } => {
            cache.friends.retain(|f| &f.user_id != user_id);
        }
    }
    cache
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuildCache {
    pub guild: Guild,
    pub members: Vec<Member>,
    pub bans: Vec<Ban>,
    pub chats: Vec<GuildChat>,
    pub roles: Vec<Role>,
}

impl GuildCache {
    pub fn new(guild: Guild) -> Self {
        Self {
            guild,
            members: Vec::new(),
            bans: Vec::new(),
            chats: Vec::new(),
            roles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuildEvent {
    MemberKicked { user_id: UserId },
    MemberBanned { user_id: UserId },
    MemberUnbanned { user_id: UserId },
    ChatCreated(GuildChat),
    ChatRenamed { chat_id: String, chat_name: String },
    ChatDeleted { chat_id: String },
    GuildRenamed { guild_name: String },
    OwnershipTransferred { owner_id: UserId },
    RoleCreated(Role),
    RoleRemoved { role_id: String },
}

pub fn reduce_guild(mut cache: GuildCache, event: &GuildEvent) -> GuildCache {
    match event {
        GuildEvent::MemberKicked { user_id } => {
            cache.members.retain(|m| &m.user_id != user_id);
        }
        GuildEvent::MemberBanned { user_id } => {
            if let Some(pos) = cache.members.iter().position(|m| &m.user_id == user_id) {
                let member = cache.members.remove(pos);
                if !cache.bans.iter().any(|b| &b.user_id == user_id) {
                    cache.bans.push(Ban {
                        user_id: member.user_id,
                        username: member.username,
                        created_at: None,
                    });
                }
            }
        }
        GuildEvent::MemberUnbanned { user_id } => {
            cache.bans.retain(|b| &b.user_id != user_id);
        }
        GuildEvent::ChatCreated(chat) => {
            if !cache.chats.iter().any(|c| c.chat_id == chat.chat_id) {
                cache.chats.push(chat.clone());
            }
        }
        GuildEvent::ChatRenamed { chat_id, chat_name } => {
            if let Some(chat) = cache.chats.iter_mut().find(|c| &c.chat_id == chat_id) {
                chat.chat_name = chat_name.clone();
            }
        }
        GuildEvent::ChatDeleted { chat_id } => {
            cache.chats.retain(|c| &c.chat_id != chat_id);
        }
        GuildEvent::GuildRenamed { guild_name } => {
            cache.guild.guild_name = guild_name.clone();
        }
        GuildEvent::OwnershipTransferred { owner_id } => {
            cache.guild.owner_id = Some(owner_id.clone());
        }
        GuildEvent::RoleCreated(role) => {
            if !cache.roles.iter().any(|r| r.role_id == role.role_id) {
                cache.roles.push(role.clone());
            }
        }
        GuildEvent::RoleRemoved { role_id } => {
            cache.roles.retain(|r| &r.role_id != role_id);
        }
    }
    cache
}
