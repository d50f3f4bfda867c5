use std::time::Duration;

use tracing::info;

use parley_api::{ApiClient, ApiError, PermissionProvider, SessionStore};
use parley_gateway::{ChannelManager, CommandReceiver};

use crate::boundary::AuthBoundary;
use crate::config::Config;
use crate::routes::{Location, Route, guard};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Root scope. Built once and handed to every view by clone.
#[derive(Clone)]
pub struct AppContext {
    pub api: ApiClient,
    pub manager: ChannelManager,
    pub permissions: PermissionProvider,
    pub auth: AuthBoundary,
    pub location: Location,
}

impl AppContext {
    /// Returns the context plus the command receiver for
    /// [`parley_gateway::connection::run`].
    pub fn new(config: &Config) -> Result<(Self, CommandReceiver), ApiError> {
        let session = match &config.token_file {
            Some(path) => SessionStore::with_token_file(path),
            None => SessionStore::new(),
        };

        let api = ApiClient::with_timeout(&config.api_url, session.clone(), REQUEST_TIMEOUT)?;
        Ok(Self::with_api(api, config))
    }

    pub fn with_api(api: ApiClient, config: &Config) -> (Self, CommandReceiver) {
        let session = api.session().clone();
        let relay = api.rebased(config.gateway.relay_base());
        let (manager, commands) = ChannelManager::new(session.clone(), relay, config.gateway.clone());

        let location = Location::new(guard(Route::Home, session.is_authenticated()));
        let auth = AuthBoundary::new(session, manager.clone(), location.clone());
        info!("Client ready, API at {}", api.base_url());

        let ctx = Self {
            api,
            manager,
            permissions: PermissionProvider::new(),
            auth,
            location,
        };
        (ctx, commands)
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }
}
