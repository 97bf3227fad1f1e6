use serde::{Deserialize, Serialize};
use tessera_application::{AuditLogEntry, AuditLogQuery};
use tessera_domain::UserId;
use uuid::Uuid;

/// Query parameters for audit log listing.
#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
}

impl From<AuditLogQueryParams> for AuditLogQuery {
    fn from(params: AuditLogQueryParams) -> Self {
        Self {
            limit: params.limit.unwrap_or(50),
            offset: params.offset.unwrap_or(0),
            action: params.action,
            actor_id: params.actor_id.map(UserId::from_uuid),
        }
    }
}

/// Audit log entry as exposed over the API.
#[derive(Debug, Serialize)]
pub struct AuditLogEntryResponse {
    pub id: Uuid,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub detail: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            actor_id: entry.actor_id.map(|id| id.as_uuid()),
            detail: entry.detail,
            created_at: entry.created_at,
        }
    }
}
