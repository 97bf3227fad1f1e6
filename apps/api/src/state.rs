use std::sync::Arc;

use tessera_application::{
    AssignmentService, AuditLogService, AuthService, PermissionService, PolicyResolver,
    RevocationService, RoleService, TokenCodec, UserAdminService,
};
use tessera_core::{AppError, AuthenticatedUser};

use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_admin_service: UserAdminService,
    pub role_service: RoleService,
    pub permission_service: PermissionService,
    pub assignment_service: AssignmentService,
    pub revocation_service: RevocationService,
    pub audit_log_service: AuditLogService,
    pub token_codec: TokenCodec,
    pub policy_resolver: Arc<PolicyResolver>,
}

impl AppState {
    /// Enforces the named authorization policy against the caller.
    ///
    /// Each protected handler declares its policy by calling this first,
    /// so the demanded policy is visible right where the operation runs.
    pub fn authorize(&self, user: &AuthenticatedUser, policy_name: &str) -> ApiResult<()> {
        let requirement = self.policy_resolver.resolve(policy_name)?;
        if !requirement.evaluate(user) {
            return Err(AppError::Forbidden("insufficient permissions".to_owned()).into());
        }

        Ok(())
    }
}
