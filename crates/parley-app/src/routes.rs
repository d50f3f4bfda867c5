//! Client routes and the authentication guard in front of them.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

use parley_types::ChatId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Home,
    Me,
    Chat { chat_id: ChatId },
    Guild { guild_id: String, chat_id: Option<ChatId> },
}

impl Route {
    /// Everything except the login and register surfaces needs a session.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::Register => f.write_str("/register"),
            Route::Home => f.write_str("/"),
            Route::Me => f.write_str("/me"),
            Route::Chat { chat_id } => write!(f, "/chats/{}", chat_id),
            Route::Guild { guild_id, chat_id: None } => write!(f, "/guilds/{}", guild_id),
            Route::Guild { guild_id, chat_id: Some(chat_id) } => {
                write!(f, "/guilds/{}/chats/{}", guild_id, chat_id)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no route matches {0}")]
pub struct UnknownRoute(pub String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["me"] => Route::Me,
            ["chats", chat_id] => Route::Chat {
                chat_id: chat_id.to_string(),
            },
            ["guilds", guild_id] => Route::Guild {
                guild_id: guild_id.to_string(),
                chat_id: None,
            },
            ["guilds", guild_id, "chats", chat_id] => Route::Guild {
                guild_id: guild_id.to_string(),
                chat_id: Some(chat_id.to_string()),
            },
            _ => return Err(UnknownRoute(path.to_string())),
        };
        Ok(route)
    }
}

/// The route actually shown for `requested` given the session state.
pub fn guard(requested: Route, authenticated: bool) -> Route {
    match (requested.is_protected(), authenticated) {
        (true, false) => Route::Login,
        (false, true) => Route::Home,
        _ => requested,
    }
}

/// Shared current location. Every clone sees the same route.
#[derive(Clone)]
pub struct Location {
    current: Arc<Mutex<Route>>,
}

impl Location {
    pub fn new(start: Route) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn current(&self) -> Route {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn navigate(&self, route: Route) {
        debug!("Navigating to {}", route);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = route;
    }
}
