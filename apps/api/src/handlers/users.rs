use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tessera_application::{CreateUserInput, UpdateUserInput};
use tessera_core::AuthenticatedUser;
use tessera_domain::UserId;
use uuid::Uuid;

use crate::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    state.authorize(&actor, "Perm:Users.Read")?;

    let users = state
        .user_admin_service
        .list()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    state.authorize(&actor, "Perm:Users.Read")?;

    let user = state
        .user_admin_service
        .get(UserId::from_uuid(user_id))
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    state.authorize(&actor, "Perm:Users.Create")?;

    let user = state
        .user_admin_service
        .create(
            &actor,
            CreateUserInput {
                username: payload.username,
                display_name: payload.display_name,
                email: payload.email,
                password: payload.password,
                legacy_role: payload.legacy_role,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn deactivate_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.authorize(&actor, "Perm:Users.Delete")?;

    state
        .user_admin_service
        .deactivate(&actor, UserId::from_uuid(user_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    state.authorize(&actor, "Perm:Users.Update")?;

    let user = state
        .user_admin_service
        .update(
            &actor,
            UserId::from_uuid(user_id),
            UpdateUserInput {
                display_name: payload.display_name,
                email: payload.email,
                legacy_role: payload.legacy_role,
                active: payload.active,
                password: payload.password,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}
