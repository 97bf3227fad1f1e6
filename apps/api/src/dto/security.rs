use serde::{Deserialize, Serialize};
use tessera_application::ReplaceOutcome;
use tessera_domain::{Permission, Role};
use uuid::Uuid;

/// Incoming payload for role creation and update.
#[derive(Debug, Deserialize)]
pub struct SaveRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Incoming payload for permission creation and update.
#[derive(Debug, Deserialize)]
pub struct SavePermissionRequest {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Role record as exposed over the API.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.as_uuid(),
            name: String::from(role.name),
            description: role.description,
            active: role.active,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// Permission record as exposed over the API.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id.as_uuid(),
            name: String::from(permission.name),
            description: permission.description,
            active: permission.active,
            created_at: permission.created_at,
            updated_at: permission.updated_at,
        }
    }
}

/// Incoming payload replacing a role's entire permission set.
#[derive(Debug, Deserialize)]
pub struct AssignRolePermissionsRequest {
    pub role_id: Uuid,
    pub permission_ids: Vec<Uuid>,
}

/// Incoming payload replacing a user's entire role set.
#[derive(Debug, Deserialize)]
pub struct AssignUserRolesRequest {
    pub user_id: Uuid,
    pub role_ids: Vec<Uuid>,
}

/// Row counts reported by a whole-set replacement.
#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub removed: u64,
    pub inserted: u64,
}

impl From<ReplaceOutcome> for ReplaceResponse {
    fn from(outcome: ReplaceOutcome) -> Self {
        Self {
            removed: outcome.removed,
            inserted: outcome.inserted,
        }
    }
}
