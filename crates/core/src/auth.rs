use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity reconstructed from a verified access credential.
///
/// The role and permission lists are the snapshot embedded at issuance time;
/// request handling never re-queries live grants (see the revocation gate for
/// the only post-issuance invalidation path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    user_id: Uuid,
    username: String,
    token_id: Option<String>,
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl AuthenticatedUser {
    /// Creates an identity from verified credential claims.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        token_id: Option<String>,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            token_id,
            roles,
            permissions,
        }
    }

    /// Returns the stable user identifier (`sub` claim).
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Returns the username the credential was issued to.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the unique credential identifier (`jti`), if present.
    ///
    /// Credentials without a `jti` are not revocable; the revocation gate
    /// skips them.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Returns the role-name snapshot embedded in the credential.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns the permission-name snapshot embedded in the credential.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Returns whether the credential carries the named role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|value| value == role)
    }

    /// Returns whether the credential carries the named `perm` claim.
    ///
    /// Comparison is exact and case-sensitive; there is no wildcarding.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|value| value == permission)
    }
}
