//! Per-guild permission snapshot and the provider that scopes it.
//!
//! A snapshot is immutable once built. Entering a guild fetches a fresh
//! one and swaps it in whole; nothing ever patches individual entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use parley_types::api::PermissionsResponse;
use parley_types::permissions::PermissionKey;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::guilds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub allowed: bool,
    /// Role or policy that granted (or withheld) the permission.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionSnapshot {
    guild_id: String,
    entries: HashMap<PermissionKey, Permission>,
}

impl PermissionSnapshot {
    pub fn from_response(guild_id: impl Into<String>, resp: PermissionsResponse) -> Self {
        let guild_id = guild_id.into();
        let mut entries = HashMap::new();

        for entry in resp.permissions {
            match entry.permission.parse::<PermissionKey>() {
                Ok(key) => {
                    entries.insert(
                        key,
                        Permission {
                            allowed: entry.allowed,
                            reason: entry.granted_by_role,
                        },
                    );
                }
                Err(e) => warn!("Guild {}: skipping {}", guild_id, e),
            }
        }

        Self { guild_id, entries }
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    pub fn permission(&self, key: PermissionKey) -> Option<&Permission> {
        self.entries.get(&key)
    }

    /// Absent entries count as not allowed.
    pub fn allows(&self, key: PermissionKey) -> bool {
        self.permission(key).is_some_and(|p| p.allowed)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PermissionError {
    #[error("permission snapshot consumed outside a guild scope")]
    OutsideProvider,
}

/// Holds the snapshot for the guild currently on screen.
#[derive(Clone, Default)]
pub struct PermissionProvider {
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Default)]
struct ProviderState {
    /// Bumped on every enter/exit so a slow fetch for a guild the user
    /// already navigated away from cannot install itself.
    generation: u64,
    target: Option<String>,
    current: Option<Arc<PermissionSnapshot>>,
}

impl PermissionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a guild scope. Re-entering the guild already in scope keeps
    /// the existing snapshot; use [`PermissionProvider::refresh`] to refetch.
    pub async fn enter_guild(
        &self,
        api: &ApiClient,
        guild_id: &str,
    ) -> Result<Arc<PermissionSnapshot>, ApiError> {
        if let Ok(current) = self.snapshot() {
            if current.guild_id() == guild_id {
                return Ok(current);
            }
        }
        self.fetch(api, guild_id).await
    }

    /// Refetch the snapshot for the guild in scope.
    pub async fn refresh(&self, api: &ApiClient) -> Result<Arc<PermissionSnapshot>, ApiError> {
        let target = self.lock().target.clone();
        match target {
            Some(guild_id) => self.fetch(api, &guild_id).await,
            None => Err(PermissionError::OutsideProvider.into()),
        }
    }

    async fn fetch(&self, api: &ApiClient, guild_id: &str) -> Result<Arc<PermissionSnapshot>, ApiError> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.target = Some(guild_id.to_string());
            state.current = None;
            state.generation
        };

        let resp = guilds::permissions(api, guild_id).await?;
        let snapshot = Arc::new(PermissionSnapshot::from_response(guild_id, resp));

        let mut state = self.lock();
        if state.generation == generation {
            state.current = Some(snapshot.clone());
            info!("Installed permission snapshot for guild {}", guild_id);
        } else {
            debug!("Discarding stale permission snapshot for guild {}", guild_id);
        }
        Ok(snapshot)
    }

    /// Replace the snapshot wholesale.
    pub fn install(&self, snapshot: PermissionSnapshot) {
        let mut state = self.lock();
        state.generation += 1;
        state.target = Some(snapshot.guild_id.clone());
        state.current = Some(Arc::new(snapshot));
    }

    pub fn exit_guild(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.target = None;
        state.current = None;
    }

    pub fn snapshot(&self) -> Result<Arc<PermissionSnapshot>, PermissionError> {
        self.lock().current.clone().ok_or(PermissionError::OutsideProvider)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::api::PermissionEntry;

    fn entry(permission: &str, allowed: bool) -> PermissionEntry {
        PermissionEntry {
            permission: permission.into(),
            allowed,
            granted_by_role: Some("Moderator".into()),
        }
    }

    #[test]
    fn snapshot_lookup_and_unknown_keys() {
        let resp = PermissionsResponse {
            permissions: vec![
                entry("can_manage_channels", false),
                entry("can_kick_members", true),
                entry("can_teleport", true),
            ],
        };
        let snapshot = PermissionSnapshot::from_response("g1", resp);

        assert!(!snapshot.allows(PermissionKey::ManageChannels));
        assert!(snapshot.allows(PermissionKey::KickMembers));
        assert!(!snapshot.allows(PermissionKey::BanMembers));
        assert_eq!(snapshot.permission(PermissionKey::BanMembers), None);
        assert_eq!(
            snapshot.permission(PermissionKey::KickMembers).and_then(|p| p.reason.as_deref()),
            Some("Moderator")
        );
    }

    #[test]
    fn provider_outside_scope_is_an_error() {
        let provider = PermissionProvider::new();
        assert_eq!(provider.snapshot().unwrap_err(), PermissionError::OutsideProvider);

        provider.install(PermissionSnapshot::from_response("g1", PermissionsResponse::default()));
        assert_eq!(provider.snapshot().unwrap().guild_id(), "g1");

        provider.exit_guild();
        assert!(provider.snapshot().is_err());
    }

    #[test]
    fn install_replaces_wholesale() {
        let provider = PermissionProvider::new();
        provider.install(PermissionSnapshot::from_response(
            "g1",
            PermissionsResponse {
                permissions: vec![entry("can_ban_members", true), entry("can_message", true)],
            },
        ));
        let before = provider.snapshot().unwrap();

        provider.install(PermissionSnapshot::from_response(
            "g1",
            PermissionsResponse {
                permissions: vec![entry("can_message", true)],
            },
        ));
        let after = provider.snapshot().unwrap();

        assert!(before.allows(PermissionKey::BanMembers));
        assert!(!after.allows(PermissionKey::BanMembers));
        assert!(after.allows(PermissionKey::Message));
    }
}
