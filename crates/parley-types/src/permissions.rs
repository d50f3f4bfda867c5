use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Guild-scoped capabilities. The set is closed: anything else the server
/// sends is not a permission this client knows how to gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionKey {
    #[serde(rename = "can_manage_channels")]
    ManageChannels,
    #[serde(rename = "can_manage_roles")]
    ManageRoles,
    #[serde(rename = "can_manage_permissions")]
    ManagePermissions,
    #[serde(rename = "can_kick_members")]
    KickMembers,
    #[serde(rename = "can_ban_members")]
    BanMembers,
    #[serde(rename = "can_message")]
    Message,
    #[serde(rename = "can_change_owner")]
    ChangeOwner,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 7] = [
        PermissionKey::ManageChannels,
        PermissionKey::ManageRoles,
        PermissionKey::ManagePermissions,
        PermissionKey::KickMembers,
        PermissionKey::BanMembers,
        PermissionKey::Message,
        PermissionKey::ChangeOwner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageChannels => "can_manage_channels",
            Self::ManageRoles => "can_manage_roles",
            Self::ManagePermissions => "can_manage_permissions",
            Self::KickMembers => "can_kick_members",
            Self::BanMembers => "can_ban_members",
            Self::Message => "can_message",
            Self::ChangeOwner => "can_change_owner",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ManageChannels => "Manage Channels",
            Self::ManageRoles => "Manage Roles",
            Self::ManagePermissions => "Manage Permissions",
            Self::KickMembers => "Kick Members",
            Self::BanMembers => "Ban Members",
            Self::Message => "Send Messages",
            Self::ChangeOwner => "Change Owner",
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission '{}'", self.0)
    }
}

impl std::error::Error for UnknownPermission {}

impl FromStr for PermissionKey {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back() {
        for key in PermissionKey::ALL {
            assert_eq!(key.as_str().parse::<PermissionKey>(), Ok(key));
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!("can_fly".parse::<PermissionKey>().is_err());
    }
}
