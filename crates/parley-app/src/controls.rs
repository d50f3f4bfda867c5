use parley_api::PermissionSnapshot;
use parley_types::permissions::PermissionKey;

/// Guild screen controls that depend on a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    CreateChannel,
    ManageRoles,
    EditPermissions,
    KickMember,
    BanMember,
    MessageInput,
    TransferOwnership,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::CreateChannel,
        Control::ManageRoles,
        Control::EditPermissions,
        Control::KickMember,
        Control::BanMember,
        Control::MessageInput,
        Control::TransferOwnership,
    ];

    pub fn required(self) -> PermissionKey {
        match self {
            Control::CreateChannel => PermissionKey::ManageChannels,
            Control::ManageRoles => PermissionKey::ManageRoles,
            Control::EditPermissions => PermissionKey::ManagePermissions,
            Control::KickMember => PermissionKey::KickMembers,
            Control::BanMember => PermissionKey::BanMembers,
            Control::MessageInput => PermissionKey::Message,
            Control::TransferOwnership => PermissionKey::ChangeOwner,
        }
    }
}

/// Controls to render. Disallowed ones are left out entirely.
pub fn visible_controls(snapshot: &PermissionSnapshot) -> Vec<Control> {
    Control::ALL
        .into_iter()
        .filter(|c| snapshot.allows(c.required()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::api::{PermissionEntry, PermissionsResponse};

    fn snapshot(entries: &[(&str, bool)]) -> PermissionSnapshot {
        PermissionSnapshot::from_response(
            "g1",
            PermissionsResponse {
                permissions: entries
                    .iter()
                    .map(|(permission, allowed)| PermissionEntry {
                        permission: permission.to_string(),
                        allowed: *allowed,
                        granted_by_role: None,
                    })
                    .collect(),
            },
        )
    }

    #[test]
    fn denied_manage_channels_omits_create_channel() {
        let controls = visible_controls(&snapshot(&[
            ("can_manage_channels", false),
            ("can_message", true),
            ("can_kick_members", true),
        ]));
        assert!(!controls.contains(&Control::CreateChannel));
        assert_eq!(controls, [Control::KickMember, Control::MessageInput]);
    }

    #[test]
    fn everything_allowed() {
        let all: Vec<_> = PermissionKey::ALL.iter().map(|k| (k.as_str(), true)).collect();
        assert_eq!(visible_controls(&snapshot(&all)), Control::ALL);
    }
}
