use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tessera_application::SavePermissionInput;
use tessera_core::AuthenticatedUser;
use tessera_domain::PermissionId;
use uuid::Uuid;

use crate::dto::{PermissionResponse, SavePermissionRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    state.authorize(&actor, "Perm:Permissions.Read")?;

    let permissions = state
        .permission_service
        .list()
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn get_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(permission_id): Path<Uuid>,
) -> ApiResult<Json<PermissionResponse>> {
    state.authorize(&actor, "Perm:Permissions.Read")?;

    let permission = state
        .permission_service
        .get(PermissionId::from_uuid(permission_id))
        .await?;

    Ok(Json(PermissionResponse::from(permission)))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<SavePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    state.authorize(&actor, "Perm:Permissions.Create")?;

    let permission = state
        .permission_service
        .create(
            &actor,
            SavePermissionInput {
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PermissionResponse::from(permission)),
    ))
}

pub async fn deactivate_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(permission_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.authorize(&actor, "Perm:Permissions.Delete")?;

    state
        .permission_service
        .deactivate(&actor, PermissionId::from_uuid(permission_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(permission_id): Path<Uuid>,
    Json(payload): Json<SavePermissionRequest>,
) -> ApiResult<Json<PermissionResponse>> {
    state.authorize(&actor, "Perm:Permissions.Update")?;

    let permission = state
        .permission_service
        .update(
            &actor,
            PermissionId::from_uuid(permission_id),
            SavePermissionInput {
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await?;

    Ok(Json(PermissionResponse::from(permission)))
}
