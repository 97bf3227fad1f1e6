//! PostgreSQL-backed role repository.

use async_trait::async_trait;
use sqlx::PgPool;

use tessera_application::RoleRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{Role, RoleId, RoleName, UserId};

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RoleRow {
    pub(crate) id: uuid::Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) active: bool,
    pub(crate) created_at: chrono::DateTime<chrono::Utc>,
    pub(crate) updated_at: chrono::DateTime<chrono::Utc>,
    pub(crate) created_by: Option<uuid::Uuid>,
    pub(crate) updated_by: Option<uuid::Uuid>,
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> AppResult<Self> {
        Ok(Self {
            id: RoleId::from_uuid(row.id),
            name: RoleName::new(row.name)?,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by.map(UserId::from_uuid),
            updated_by: row.updated_by.map(UserId::from_uuid),
        })
    }
}

pub(crate) const ROLE_COLUMNS: &str =
    "id, name, description, active, created_at, updated_at, created_by, updated_by";

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn create(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles
                (id, name, description, active, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .bind(role.created_by.map(|id| id.as_uuid()))
        .bind(role.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("role '{}' already exists", role.name))
            }
            other => AppError::Internal(format!("failed to create role: {other}")),
        })?;

        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2,
                description = $3,
                active = $4,
                updated_at = $5,
                updated_by = $6
            WHERE id = $1
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.active)
        .bind(role.updated_at)
        .bind(role.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("role '{}' already exists", role.name))
            }
            other => AppError::Internal(format!("failed to update role: {other}")),
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        row.map(Role::try_from).transpose()
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn exists(&self, id: RoleId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check role: {error}")))?;

        Ok(exists)
    }

    async fn filter_existing(&self, ids: &[RoleId]) -> AppResult<Vec<RoleId>> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let found = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM roles WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to filter roles: {error}")))?;

        Ok(found.into_iter().map(RoleId::from_uuid).collect())
    }
}
