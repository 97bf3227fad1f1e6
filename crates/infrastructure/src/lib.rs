//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod postgres_assignment_repository;
mod postgres_audit_repository;
mod postgres_permission_repository;
mod postgres_revocation_repository;
mod postgres_role_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_revocation_repository::PostgresRevocationRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_repository::PostgresUserRepository;
