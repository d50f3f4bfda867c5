//! REST side of the parley client: the session store, the authenticated
//! HTTP client for every collaborator endpoint, and the guild permission
//! snapshot provider.

pub mod auth;
pub mod chats;
pub mod client;
pub mod error;
pub mod friends;
pub mod guilds;
pub mod messages;
pub mod permissions;
pub mod session;

pub use client::ApiClient;
pub use error::ApiError;
pub use permissions::{PermissionProvider, PermissionSnapshot};
pub use session::SessionStore;
