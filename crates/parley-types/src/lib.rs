pub mod api;
pub mod events;
pub mod models;
pub mod permissions;

/// Opaque conversation identifier, shared by DMs and guild channels.
pub type ChatId = String;

/// Opaque user identifier as issued by the collaborator.
pub type UserId = String;
