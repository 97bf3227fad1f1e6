//! Stable audit actions emitted by application use-cases.

use serde::{Deserialize, Serialize};

/// Stable audit action identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted on successful login.
    LoginSucceeded,
    /// Emitted on a failed login attempt.
    LoginFailed,
    /// Emitted when an inactive user attempts to log in.
    LoginBlocked,
    /// Emitted when a user changes their password.
    PasswordChanged,
    /// Emitted when an access token is explicitly revoked.
    TokenRevoked,
    /// Emitted when a role's permission set is replaced.
    RolePermissionsReplaced,
    /// Emitted when a user's role set is replaced.
    UserRolesReplaced,
    /// Emitted when a user record is created.
    UserCreated,
    /// Emitted when a user record is updated.
    UserUpdated,
    /// Emitted when a user record is deactivated.
    UserDeactivated,
    /// Emitted when a role record is created.
    RoleCreated,
    /// Emitted when a role record is updated or deactivated.
    RoleUpdated,
    /// Emitted when a permission record is created.
    PermissionCreated,
    /// Emitted when a permission record is updated or deactivated.
    PermissionUpdated,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "auth.login",
            Self::LoginFailed => "auth.login.fail",
            Self::LoginBlocked => "auth.login.blocked",
            Self::PasswordChanged => "auth.change_password",
            Self::TokenRevoked => "auth.token.revoked",
            Self::RolePermissionsReplaced => "role_permissions.assign",
            Self::UserRolesReplaced => "user_roles.assign",
            Self::UserCreated => "users.created",
            Self::UserUpdated => "users.updated",
            Self::UserDeactivated => "users.deactivated",
            Self::RoleCreated => "roles.created",
            Self::RoleUpdated => "roles.updated",
            Self::PermissionCreated => "permissions.created",
            Self::PermissionUpdated => "permissions.updated",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::AuditAction;

    #[test]
    fn storage_values_are_distinct() {
        let actions = [
            AuditAction::LoginSucceeded,
            AuditAction::LoginFailed,
            AuditAction::LoginBlocked,
            AuditAction::PasswordChanged,
            AuditAction::TokenRevoked,
            AuditAction::RolePermissionsReplaced,
            AuditAction::UserRolesReplaced,
        ];
        let mut values: Vec<&str> = actions.iter().map(AuditAction::as_str).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), actions.len());
    }
}
