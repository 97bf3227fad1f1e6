//! PostgreSQL-backed revocation ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tessera_application::RevocationRepository;
use tessera_core::{AppError, AppResult};

/// PostgreSQL implementation of the revocation ledger port.
#[derive(Clone)]
pub struct PostgresRevocationRepository {
    pool: PgPool,
}

impl PostgresRevocationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationRepository for PostgresRevocationRepository {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        // The primary key on jti makes concurrent double-revocation a no-op.
        sqlx::query(
            r#"
            INSERT INTO revoked_access_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record revocation: {error}")))?;

        Ok(())
    }

    async fn contains_active(&self, jti: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let revoked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM revoked_access_tokens
                WHERE jti = $1
                  AND expires_at > $2
            )
            "#,
        )
        .bind(jti)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check revocation: {error}")))?;

        Ok(revoked)
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let pruned = sqlx::query("DELETE FROM revoked_access_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to prune revocations: {error}"))
            })?
            .rows_affected();

        if pruned > 0 {
            tracing::debug!(pruned, "pruned expired revocation ledger rows");
        }

        Ok(pruned)
    }
}
