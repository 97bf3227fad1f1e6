//! Application services and repository ports for Tessera.
//!
//! Each service owns the ports it depends on; infrastructure provides the
//! PostgreSQL implementations.

#![forbid(unsafe_code)]

/// Assignment engine: whole-set replacement of junction memberships.
pub mod assignment_service;
/// Audit sink and audit log read side.
pub mod audit;
/// Login, password change, and credential issuance.
pub mod auth_service;
/// Permission catalog administration.
pub mod permission_service;
/// Authorization-policy resolution.
pub mod policy;
/// Access-token revocation ledger.
pub mod revocation_service;
/// Role catalog administration.
pub mod role_service;
/// Signed access-token encoding and verification.
pub mod token_issuer;
/// User account administration.
pub mod user_admin_service;

pub use assignment_service::{AssignmentRepository, AssignmentService, ReplaceOutcome};
pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditLogService, AuditRepository};
pub use auth_service::{AuthService, IssuedToken, PasswordHasher};
pub use permission_service::{PermissionRepository, PermissionService, SavePermissionInput};
pub use policy::{PERMISSION_POLICY_PREFIX, PolicyRequirement, PolicyResolver};
pub use revocation_service::{RevocationRepository, RevocationService};
pub use role_service::{RoleRepository, RoleService, SaveRoleInput};
pub use token_issuer::{
    AccessTokenClaims, DEFAULT_TOKEN_LIFETIME_MINUTES, JWT_SECRET_MIN_LENGTH, JwtConfig,
    MintedToken, TokenCodec,
};
pub use user_admin_service::{CreateUserInput, UpdateUserInput, UserAdminService, UserRepository};
