use axum::Json;
use axum::extract::{Extension, Query, State};
use tessera_core::AuthenticatedUser;

use crate::dto::{AuditLogEntryResponse, AuditLogQueryParams};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Query(params): Query<AuditLogQueryParams>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    state.authorize(&actor, "Perm:Logs.Read")?;

    let entries = state
        .audit_log_service
        .list_recent(params.into())
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
