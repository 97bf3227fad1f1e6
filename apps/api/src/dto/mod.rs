//! Request and response payloads.

mod auth;
mod logs;
mod security;
mod users;

pub use auth::{ChangePasswordRequest, LoginRequest, LoginResponse};
pub use logs::{AuditLogEntryResponse, AuditLogQueryParams};
pub use security::{
    AssignRolePermissionsRequest, AssignUserRolesRequest, PermissionResponse, ReplaceResponse,
    RoleResponse, SavePermissionRequest, SaveRoleRequest,
};
pub use users::{CreateUserRequest, UpdateUserRequest, UserResponse};
