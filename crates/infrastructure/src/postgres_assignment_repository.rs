//! PostgreSQL-backed assignment repository.
//!
//! Whole-set replacement runs inside a single transaction: delete every
//! junction row for the target, insert the new membership, commit. A failed
//! insert rolls the deletion back with it.

use async_trait::async_trait;
use sqlx::PgPool;

use tessera_application::{AssignmentRepository, ReplaceOutcome};
use tessera_core::{AppError, AppResult};
use tessera_domain::{Permission, PermissionId, Role, RoleId, UserId};

use crate::postgres_permission_repository::{PERMISSION_COLUMNS, PermissionRow};
use crate::postgres_role_repository::{ROLE_COLUMNS, RoleRow};

/// PostgreSQL implementation of the assignment repository port.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn permissions_for_role(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS}
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })?;

        rows.into_iter().map(Permission::try_from).collect()
    }

    async fn roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn role_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
              AND r.active
            ORDER BY r.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user role names: {error}"))
        })?;

        Ok(names)
    }

    async fn permission_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.name
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
              AND p.active
            ORDER BY p.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user permission names: {error}"))
        })?;

        Ok(names)
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<ReplaceOutcome> {
        let mut tx = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let removed = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role permissions: {error}"))
            })?
            .rows_affected();

        let mut inserted = 0;
        for permission_id in permission_ids {
            inserted += sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to insert role permission: {error}"))
            })?
            .rows_affected();
        }

        tx.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit assignment: {error}"))
        })?;

        Ok(ReplaceOutcome { removed, inserted })
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<ReplaceOutcome> {
        let mut tx = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let removed = sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear user roles: {error}"))
            })?
            .rows_affected();

        let mut inserted = 0;
        for role_id in role_ids {
            inserted += sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to insert user role: {error}"))
            })?
            .rows_affected();
        }

        tx.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit assignment: {error}"))
        })?;

        Ok(ReplaceOutcome { removed, inserted })
    }
}
