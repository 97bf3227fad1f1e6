//! Audit sink port and the read side of the audit log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_core::AppResult;
use tessera_domain::{AuditAction, UserId};
use uuid::Uuid;

/// One audit fact emitted by an application use-case.
///
/// Events are fire-and-forget from the caller's perspective: services append
/// them after the guarded operation succeeds and never read them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Stable action identifier.
    pub action: AuditAction,
    /// Acting user, when one is known.
    pub actor_id: Option<UserId>,
    /// Free-text detail for operators.
    pub detail: String,
}

/// Port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the audit log.
    async fn append(&self, event: AuditEvent) -> AppResult<()>;
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub id: Uuid,
    /// Stable action identifier as stored.
    pub action: String,
    /// Acting user, when one was known.
    pub actor_id: Option<UserId>,
    /// Free-text detail.
    pub detail: String,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: i64,
    /// Rows skipped for offset pagination.
    pub offset: i64,
    /// Optional action filter (exact match on the stored value).
    pub action: Option<String>,
    /// Optional actor filter.
    pub actor_id: Option<UserId>,
}

/// Largest page size the read side will serve.
pub const AUDIT_LOG_MAX_LIMIT: i64 = 200;

/// Port for reading audit log entries, newest first.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists the most recent entries matching the query.
    async fn list_recent(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;
}

/// Application service for the audit log read side.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates a new service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Returns recent audit entries with the limit clamped to a sane page.
    pub async fn list_recent(&self, mut query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        query.limit = query.limit.clamp(1, AUDIT_LOG_MAX_LIMIT);
        query.offset = query.offset.max(0);
        self.repository.list_recent(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tessera_core::AppResult;
    use tokio::sync::Mutex;

    use super::{AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditLogService};

    #[derive(Default)]
    struct RecordingAuditLogRepository {
        seen: Mutex<Vec<AuditLogQuery>>,
    }

    #[async_trait]
    impl AuditLogRepository for RecordingAuditLogRepository {
        async fn list_recent(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
            self.seen.lock().await.push(query);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn oversized_limits_are_clamped() {
        let repository = Arc::new(RecordingAuditLogRepository::default());
        let service = AuditLogService::new(repository.clone());

        let result = service
            .list_recent(AuditLogQuery {
                limit: 10_000,
                offset: -5,
                action: None,
                actor_id: None,
            })
            .await;
        assert!(result.is_ok());

        let seen = repository.seen.lock().await;
        assert_eq!(seen[0].limit, super::AUDIT_LOG_MAX_LIMIT);
        assert_eq!(seen[0].offset, 0);
    }
}
