//! Domain types for the Tessera administrative back end.

#![forbid(unsafe_code)]

/// Audit action identifiers.
pub mod audit;
/// Role and permission entities.
pub mod security;
/// User entity and validation rules.
pub mod user;

pub use audit::AuditAction;
pub use security::{Permission, PermissionId, PermissionName, Role, RoleId, RoleName};
pub use user::{EmailAddress, User, UserId, Username, validate_password};
