//! Error boundaries.
//!
//! Authorization failures travel as ordinary `Err` values. The root scope
//! passes every collaborator result through [`AuthBoundary::inspect`],
//! which ends the session when it sees one. Panels wrap their own work in
//! a [`PanelBoundary`] so one broken panel leaves the rest of the screen up.

use std::any::Any;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, info, warn};

use parley_api::error::SessionError;
use parley_api::{ApiError, SessionStore};
use parley_gateway::{ChannelManager, SendError};

use crate::routes::{Location, Route};

/// Errors that can mean the session is no longer valid.
pub trait AuthFailure {
    fn is_auth_failure(&self) -> bool;
}

impl AuthFailure for ApiError {
    fn is_auth_failure(&self) -> bool {
        ApiError::is_auth_failure(self)
    }
}

impl AuthFailure for SendError {
    fn is_auth_failure(&self) -> bool {
        SendError::is_auth_failure(self)
    }
}

impl AuthFailure for SessionError {
    fn is_auth_failure(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct AuthBoundary {
    session: SessionStore,
    manager: ChannelManager,
    location: Location,
}

impl AuthBoundary {
    pub fn new(session: SessionStore, manager: ChannelManager, location: Location) -> Self {
        Self {
            session,
            manager,
            location,
        }
    }

    /// Pass a result through unchanged, ending the session first if it
    /// carries an authorization failure.
    pub fn inspect<T, E>(&self, result: Result<T, E>) -> Result<T, E>
    where
        E: AuthFailure + Display,
    {
        if let Err(e) = &result {
            if e.is_auth_failure() {
                warn!("Authorization failure: {}", e);
                self.end_session();
            }
        }
        result
    }

    /// Clear the token, drop every joined chat and go to the login surface.
    pub fn end_session(&self) {
        self.session.logout();
        self.manager.leave_all();
        self.location.navigate(Route::Login);
        info!("Session ended, login required");
    }
}

/// Failure isolation for one panel. While a failure is held the panel
/// shows its fallback; the failure clears when the panel's key changes.
pub struct PanelBoundary {
    name: &'static str,
    key: Option<String>,
    failure: Option<String>,
}

impl PanelBoundary {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            key: None,
            failure: None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Record the panel's key inputs (usually the route path).
    pub fn reset_on(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.key.as_deref() == Some(key.as_str()) {
            return;
        }
        if self.failure.take().is_some() {
            debug!("Panel {} reset for {}", self.name, key);
        }
        self.key = Some(key);
    }

    /// Settle a collaborator result for this panel. Auth failures go to
    /// `auth` and are never held here.
    pub fn settle<T, E>(&mut self, auth: &AuthBoundary, result: Result<T, E>) -> Option<T>
    where
        E: AuthFailure + Display,
    {
        match auth.inspect(result) {
            Ok(value) if self.failure.is_none() => Some(value),
            Ok(_) => None,
            Err(e) if e.is_auth_failure() => None,
            Err(e) => {
                warn!("Panel {} failed: {}", self.name, e);
                self.failure = Some(e.to_string());
                None
            }
        }
    }

    /// Run panel code, turning a panic into a held failure.
    pub fn render<T>(&mut self, f: impl FnOnce() -> T) -> Option<T> {
        if self.failure.is_some() {
            return None;
        }
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Panel {} crashed: {}", self.name, message);
                self.failure = Some(message);
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panel failed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api::ApiClient;
    use parley_gateway::GatewayOptions;

    fn boundary() -> (AuthBoundary, SessionStore, ChannelManager, Location) {
        let session = SessionStore::new();
        session.login("opaque-token");
        let relay = ApiClient::new("http://127.0.0.1:9", session.clone());
        let (manager, _rx) = ChannelManager::new(session.clone(), relay, GatewayOptions::default());
        let location = Location::new(Route::Home);
        let auth = AuthBoundary::new(session.clone(), manager.clone(), location.clone());
        (auth, session, manager, location)
    }

    #[test]
    fn auth_failure_tears_down_session() {
        let (auth, session, manager, location) = boundary();
        manager.join_chat("general");

        let result: Result<(), ApiError> = Err(ApiError::Unauthorized);
        assert!(auth.inspect(result).is_err());

        assert!(!session.is_authenticated());
        assert_eq!(manager.join_count("general"), 0);
        assert_eq!(location.current(), Route::Login);
    }

    #[test]
    fn other_failures_pass_through() {
        let (auth, session, _manager, location) = boundary();
        let result: Result<(), ApiError> = Err(ApiError::Rejected {
            status: 404,
            message: "Guild not found".into(),
        });
        assert!(auth.inspect(result).is_err());
        assert!(session.is_authenticated());
        assert_eq!(location.current(), Route::Home);
    }

    #[test]
    fn panel_holds_failure_until_key_changes() {
        let (auth, _session, _manager, _location) = boundary();
        let mut panel = PanelBoundary::new("members");
        panel.reset_on("/guilds/g1");

        let failed: Result<u32, ApiError> = Err(ApiError::Rejected {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(panel.settle(&auth, failed), None);
        assert_eq!(panel.failure(), Some("boom"));
        assert_eq!(panel.settle(&auth, Ok::<_, ApiError>(1)), None);

        panel.reset_on("/guilds/g1");
        assert!(panel.failure().is_some());

        panel.reset_on("/guilds/g2");
        assert_eq!(panel.failure(), None);
        assert_eq!(panel.settle(&auth, Ok::<_, ApiError>(2)), Some(2));
    }

    #[test]
    fn panel_forwards_auth_failures() {
        let (auth, session, _manager, _location) = boundary();
        let mut panel = PanelBoundary::new("chat");

        assert_eq!(panel.settle(&auth, Err::<(), _>(ApiError::Unauthorized)), None);
        assert_eq!(panel.failure(), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn panel_isolates_panics() {
        let mut panel = PanelBoundary::new("roles");
        let mut other = PanelBoundary::new("chats");

        assert_eq!(panel.render(|| -> u8 { panic!("bad role colour") }), None);
        assert_eq!(panel.failure(), Some("bad role colour"));
        assert_eq!(other.render(|| 7), Some(7));
    }
}
