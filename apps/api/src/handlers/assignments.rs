use axum::Json;
use axum::extract::{Extension, Path, State};
use tessera_core::AuthenticatedUser;
use tessera_domain::{PermissionId, RoleId, UserId};
use uuid::Uuid;

use crate::dto::{
    AssignRolePermissionsRequest, AssignUserRolesRequest, PermissionResponse, ReplaceResponse,
    RoleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_role_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    state.authorize(&actor, "Perm:RolePermissions.Read")?;

    let permissions = state
        .assignment_service
        .permissions_for_role(RoleId::from_uuid(role_id))
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn assign_role_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<AssignRolePermissionsRequest>,
) -> ApiResult<Json<ReplaceResponse>> {
    state.authorize(&actor, "Perm:RolePermissions.Assign")?;

    let outcome = state
        .assignment_service
        .replace_role_permissions(
            &actor,
            RoleId::from_uuid(payload.role_id),
            payload
                .permission_ids
                .into_iter()
                .map(PermissionId::from_uuid)
                .collect(),
        )
        .await?;

    Ok(Json(ReplaceResponse::from(outcome)))
}

pub async fn list_user_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    state.authorize(&actor, "Perm:UserRoles.Read")?;

    let roles = state
        .assignment_service
        .roles_for_user(UserId::from_uuid(user_id))
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn assign_user_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<AssignUserRolesRequest>,
) -> ApiResult<Json<ReplaceResponse>> {
    state.authorize(&actor, "Perm:UserRoles.Assign")?;

    let outcome = state
        .assignment_service
        .replace_user_roles(
            &actor,
            UserId::from_uuid(payload.user_id),
            payload
                .role_ids
                .into_iter()
                .map(RoleId::from_uuid)
                .collect(),
        )
        .await?;

    Ok(Json(ReplaceResponse::from(outcome)))
}
