use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use tessera_application::AccessTokenClaims;
use tessera_core::AuthenticatedUser;

use crate::dto::{ChangePasswordRequest, LoginRequest, LoginResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let issued = state
        .auth_service
        .login(payload.login.as_str(), payload.password.as_str())
        .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        username: issued.username,
        roles: issued.roles,
    }))
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state.authorize(&user, "SelfService")?;

    state
        .auth_service
        .change_password(
            &user,
            payload.current_password.as_str(),
            payload.new_password.as_str(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Revokes the presented token until its embedded expiry. Repeating the call
/// with the same token fails authentication upstream, which is the desired
/// end state.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(claims): Extension<AccessTokenClaims>,
) -> ApiResult<StatusCode> {
    state.authorize(&user, "SelfService")?;

    state
        .revocation_service
        .revoke_current(&user, claims.expires_at())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
