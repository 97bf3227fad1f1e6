//! PostgreSQL-backed audit log, write and read sides.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};

use tessera_application::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
use tessera_core::{AppError, AppResult};
use tessera_domain::UserId;

/// PostgreSQL implementation of the audit ports.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (action, actor_id, detail)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(event.action.as_str())
        .bind(event.actor_id.map(|id| id.as_uuid()))
        .bind(event.detail.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: uuid::Uuid,
    action: String,
    actor_id: Option<uuid::Uuid>,
    detail: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            actor_id: row.actor_id.map(UserId::from_uuid),
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditRepository {
    async fn list_recent(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let mut builder = QueryBuilder::new(
            "SELECT id, action, actor_id, detail, created_at FROM audit_log WHERE TRUE",
        );

        if let Some(action) = query.action.as_deref() {
            builder.push(" AND action = ").push_bind(action.to_owned());
        }
        if let Some(actor_id) = query.actor_id {
            builder.push(" AND actor_id = ").push_bind(actor_id.as_uuid());
        }

        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = builder
            .build_query_as::<AuditRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list audit log: {error}")))?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}
