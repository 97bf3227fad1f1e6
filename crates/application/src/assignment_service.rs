//! Assignment engine: whole-set replacement of junction memberships.
//!
//! Membership for one side of a many-to-many relation (a role's permissions,
//! a user's roles) is only ever rewritten as a complete set inside a single
//! transaction. There is deliberately no "add one" / "remove one" operation;
//! the whole-set contract is what keeps the atomicity guarantee simple.
//! Concurrent replace-alls for the same target race at commit time and the
//! last commit wins (documented in DESIGN.md).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, Permission, PermissionId, Role, RoleId, UserId};

use crate::audit::{AuditEvent, AuditRepository};
use crate::permission_service::PermissionRepository;
use crate::role_service::RoleRepository;
use crate::user_admin_service::UserRepository;

/// Row counts reported by a replace-all, for audit and logging.
///
/// The new membership itself is not returned; callers re-query when they
/// need the resulting set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Junction rows deleted inside the transaction.
    pub removed: u64,
    /// Junction rows inserted inside the transaction.
    pub inserted: u64,
}

/// Port for junction reads and transactional whole-set replacement.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Lists the permissions currently assigned to a role, ordered by name.
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;

    /// Lists the roles currently assigned to a user, ordered by name.
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;

    /// Distinct active role names reachable from a user.
    async fn role_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>>;

    /// Distinct active permission names reachable from a user across all of
    /// their roles (union).
    async fn permission_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>>;

    /// Atomically deletes every junction row for the role, then inserts one
    /// row per given permission id. Commits all or nothing.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<ReplaceOutcome>;

    /// Atomically deletes every junction row for the user, then inserts one
    /// row per given role id. Commits all or nothing.
    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<ReplaceOutcome>;
}

/// Application service implementing the replace-all protocol.
#[derive(Clone)]
pub struct AssignmentService {
    assignment_repository: Arc<dyn AssignmentRepository>,
    role_repository: Arc<dyn RoleRepository>,
    permission_repository: Arc<dyn PermissionRepository>,
    user_repository: Arc<dyn UserRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl AssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        assignment_repository: Arc<dyn AssignmentRepository>,
        role_repository: Arc<dyn RoleRepository>,
        permission_repository: Arc<dyn PermissionRepository>,
        user_repository: Arc<dyn UserRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            assignment_repository,
            role_repository,
            permission_repository,
            user_repository,
            audit_repository,
        }
    }

    /// Lists the permissions currently assigned to a role.
    pub async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        if !self.role_repository.exists(role_id).await? {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        self.assignment_repository.permissions_for_role(role_id).await
    }

    /// Lists the roles currently assigned to a user.
    pub async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        if !self.user_repository.exists(user_id).await? {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        self.assignment_repository.roles_for_user(user_id).await
    }

    /// Replaces a role's entire permission set.
    ///
    /// Duplicate ids are coalesced; an empty set is a legal terminal state.
    /// If any requested id does not correspond to an existing permission the
    /// whole call fails with a validation error naming the offenders and the
    /// prior membership is left untouched.
    pub async fn replace_role_permissions(
        &self,
        actor: &AuthenticatedUser,
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    ) -> AppResult<ReplaceOutcome> {
        if !self.role_repository.exists(role_id).await? {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        let requested: Vec<PermissionId> =
            permission_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let valid = self
            .permission_repository
            .filter_existing(&requested)
            .await?;

        if valid.len() != requested.len() {
            let valid_set: BTreeSet<PermissionId> = valid.into_iter().collect();
            let offenders = join_missing(requested.iter().filter(|id| !valid_set.contains(id)));
            return Err(AppError::Validation(format!(
                "one or more permission ids are not valid: {offenders}"
            )));
        }

        let outcome = self
            .assignment_repository
            .replace_role_permissions(role_id, &requested)
            .await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::RolePermissionsReplaced,
                actor_id: Some(UserId::from_uuid(actor.user_id())),
                detail: format!(
                    "replaced permissions for role '{role_id}': removed={}, inserted={}",
                    outcome.removed, outcome.inserted
                ),
            })
            .await?;

        Ok(outcome)
    }

    /// Replaces a user's entire role set. Same contract as
    /// [`Self::replace_role_permissions`], parameterized over the other
    /// junction.
    pub async fn replace_user_roles(
        &self,
        actor: &AuthenticatedUser,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> AppResult<ReplaceOutcome> {
        if !self.user_repository.exists(user_id).await? {
            return Err(AppError::NotFound(format!("user '{user_id}' was not found")));
        }

        let requested: Vec<RoleId> =
            role_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let valid = self.role_repository.filter_existing(&requested).await?;

        if valid.len() != requested.len() {
            let valid_set: BTreeSet<RoleId> = valid.into_iter().collect();
            let offenders = join_missing(requested.iter().filter(|id| !valid_set.contains(id)));
            return Err(AppError::Validation(format!(
                "one or more role ids are not valid: {offenders}"
            )));
        }

        let outcome = self
            .assignment_repository
            .replace_user_roles(user_id, &requested)
            .await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::UserRolesReplaced,
                actor_id: Some(UserId::from_uuid(actor.user_id())),
                detail: format!(
                    "replaced roles for user '{user_id}': removed={}, inserted={}",
                    outcome.removed, outcome.inserted
                ),
            })
            .await?;

        Ok(outcome)
    }
}

fn join_missing<T: std::fmt::Display>(ids: impl Iterator<Item = T>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
