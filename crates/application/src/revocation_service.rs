//! Access-token revocation ledger.
//!
//! A credential is valid by default; revocation inserts its `jti` with the
//! original expiry into the ledger. The gate rejects a presented `jti` only
//! while a ledger row exists AND its stored expiry is still in the future —
//! once the embedded expiry passes, the credential is unusable on expiry
//! grounds alone and the row becomes inert garbage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_core::{AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, UserId};

use crate::audit::{AuditEvent, AuditRepository};

/// Port for the revoked-token ledger.
#[async_trait]
pub trait RevocationRepository: Send + Sync {
    /// Records a revoked token identifier with its original expiry.
    ///
    /// Insertion is idempotent: recording the same `jti` twice is a no-op,
    /// including under concurrent calls.
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()>;

    /// Returns whether a ledger row exists for `jti` with `now` before its
    /// stored expiry.
    async fn contains_active(&self, jti: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Deletes ledger rows whose stored expiry is at or before `now`.
    async fn prune_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Application service over the revocation ledger.
#[derive(Clone)]
pub struct RevocationService {
    repository: Arc<dyn RevocationRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RevocationService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RevocationRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Revokes a token identifier until its original expiry.
    ///
    /// A blank `jti` is silently ignored: credentials without one are not
    /// revocable. Expired ledger rows are pruned opportunistically on the
    /// same call.
    pub async fn revoke(
        &self,
        actor_id: Option<UserId>,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        if jti.trim().is_empty() {
            return Ok(());
        }

        self.repository.insert(jti, expires_at).await?;
        self.repository.prune_expired(Utc::now()).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::TokenRevoked,
                actor_id,
                detail: format!("revoked access token '{jti}'"),
            })
            .await
    }

    /// Revokes the credential the caller is currently presenting.
    pub async fn revoke_current(
        &self,
        caller: &AuthenticatedUser,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let Some(jti) = caller.token_id() else {
            return Ok(());
        };

        self.revoke(Some(UserId::from_uuid(caller.user_id())), jti, expires_at)
            .await
    }

    /// Returns whether a presented token identifier is currently revoked.
    ///
    /// Tokens without a `jti` skip the gate entirely; that is a property of
    /// the credential shape, not an authorization decision.
    pub async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        if jti.trim().is_empty() {
            return Ok(false);
        }

        self.repository.contains_active(jti, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use tessera_core::AppResult;
    use tokio::sync::Mutex;

    use crate::audit::{AuditEvent, AuditRepository};

    use super::{RevocationRepository, RevocationService};

    #[derive(Default)]
    struct FakeLedger {
        rows: Mutex<HashMap<String, DateTime<Utc>>>,
        inserts: Mutex<u32>,
    }

    #[async_trait]
    impl RevocationRepository for FakeLedger {
        async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
            *self.inserts.lock().await += 1;
            self.rows
                .lock()
                .await
                .entry(jti.to_owned())
                .or_insert(expires_at);
            Ok(())
        }

        async fn contains_active(&self, jti: &str, now: DateTime<Utc>) -> AppResult<bool> {
            Ok(self
                .rows
                .lock()
                .await
                .get(jti)
                .is_some_and(|expires_at| now < *expires_at))
        }

        async fn prune_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
            let mut rows = self.rows.lock().await;
            let before = rows.len();
            rows.retain(|_, expires_at| *expires_at > now);
            Ok((before - rows.len()) as u64)
        }
    }

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn service(ledger: Arc<FakeLedger>) -> RevocationService {
        RevocationService::new(ledger, Arc::new(FakeAuditRepository::default()))
    }

    #[tokio::test]
    async fn revoked_token_is_rejected_until_its_expiry() -> AppResult<()> {
        let ledger = Arc::new(FakeLedger::default());
        let service = service(ledger);

        let expires_at = Utc::now() + Duration::minutes(30);
        service.revoke(None, "jti-1", expires_at).await?;

        assert!(service.is_revoked("jti-1").await?);
        assert!(!service.is_revoked("jti-2").await?);
        Ok(())
    }

    #[tokio::test]
    async fn expired_ledger_rows_no_longer_block() -> AppResult<()> {
        let ledger = Arc::new(FakeLedger::default());
        let service = service(ledger);

        let already_expired = Utc::now() - Duration::minutes(5);
        service.revoke(None, "jti-old", already_expired).await?;

        assert!(!service.is_revoked("jti-old").await?);
        Ok(())
    }

    #[tokio::test]
    async fn revoking_twice_is_idempotent() -> AppResult<()> {
        let ledger = Arc::new(FakeLedger::default());
        let service = service(ledger.clone());

        let expires_at = Utc::now() + Duration::minutes(30);
        service.revoke(None, "jti-1", expires_at).await?;
        service.revoke(None, "jti-1", expires_at).await?;

        assert!(service.is_revoked("jti-1").await?);
        assert_eq!(ledger.rows.lock().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn blank_jti_is_ignored() -> AppResult<()> {
        let ledger = Arc::new(FakeLedger::default());
        let service = service(ledger.clone());

        service
            .revoke(None, "  ", Utc::now() + Duration::minutes(30))
            .await?;

        assert_eq!(*ledger.inserts.lock().await, 0);
        assert!(!service.is_revoked("").await?);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_prunes_inert_rows_opportunistically() -> AppResult<()> {
        let ledger = Arc::new(FakeLedger::default());
        let service = service(ledger.clone());

        service
            .revoke(None, "jti-old", Utc::now() - Duration::minutes(1))
            .await?;
        service
            .revoke(None, "jti-new", Utc::now() + Duration::minutes(30))
            .await?;

        let rows = ledger.rows.lock().await;
        assert!(!rows.contains_key("jti-old"));
        assert!(rows.contains_key("jti-new"));
        Ok(())
    }
}
