use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tessera_application::SaveRoleInput;
use tessera_core::AuthenticatedUser;
use tessera_domain::RoleId;
use uuid::Uuid;

use crate::dto::{RoleResponse, SaveRoleRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    state.authorize(&actor, "Perm:Roles.Read")?;

    let roles = state
        .role_service
        .list()
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    state.authorize(&actor, "Perm:Roles.Read")?;

    let role = state.role_service.get(RoleId::from_uuid(role_id)).await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<SaveRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    state.authorize(&actor, "Perm:Roles.Create")?;

    let role = state
        .role_service
        .create(
            &actor,
            SaveRoleInput {
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn deactivate_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.authorize(&actor, "Perm:Roles.Delete")?;

    state
        .role_service
        .deactivate(&actor, RoleId::from_uuid(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<SaveRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    state.authorize(&actor, "Perm:Roles.Update")?;

    let role = state
        .role_service
        .update(
            &actor,
            RoleId::from_uuid(role_id),
            SaveRoleInput {
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}
