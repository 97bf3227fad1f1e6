//! PostgreSQL-backed permission repository.

use async_trait::async_trait;
use sqlx::PgPool;

use tessera_application::PermissionRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{Permission, PermissionId, PermissionName, UserId};

/// PostgreSQL implementation of the permission repository port.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PermissionRow {
    pub(crate) id: uuid::Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) active: bool,
    pub(crate) created_at: chrono::DateTime<chrono::Utc>,
    pub(crate) updated_at: chrono::DateTime<chrono::Utc>,
    pub(crate) created_by: Option<uuid::Uuid>,
    pub(crate) updated_by: Option<uuid::Uuid>,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> AppResult<Self> {
        Ok(Self {
            id: PermissionId::from_uuid(row.id),
            name: PermissionName::new(row.name)?,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by.map(UserId::from_uuid),
            updated_by: row.updated_by.map(UserId::from_uuid),
        })
    }
}

pub(crate) const PERMISSION_COLUMNS: &str =
    "id, name, description, active, created_at, updated_at, created_by, updated_by";

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions
                (id, name, description, active, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.description.as_deref())
        .bind(permission.active)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .bind(permission.created_by.map(|id| id.as_uuid()))
        .bind(permission.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("permission '{}' already exists", permission.name))
            }
            other => AppError::Internal(format!("failed to create permission: {other}")),
        })?;

        Ok(())
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2,
                description = $3,
                active = $4,
                updated_at = $5,
                updated_by = $6
            WHERE id = $1
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.description.as_deref())
        .bind(permission.active)
        .bind(permission.updated_at)
        .bind(permission.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("permission '{}' already exists", permission.name))
            }
            other => AppError::Internal(format!("failed to update permission: {other}")),
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission: {error}")))?;

        row.map(Permission::try_from).transpose()
    }

    async fn list(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(Permission::try_from).collect()
    }

    async fn filter_existing(&self, ids: &[PermissionId]) -> AppResult<Vec<PermissionId>> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let found = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM permissions WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to filter permissions: {error}")))?;

        Ok(found.into_iter().map(PermissionId::from_uuid).collect())
    }
}
