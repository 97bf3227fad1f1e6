//! PostgreSQL-backed user repository.

use async_trait::async_trait;
use sqlx::PgPool;

use tessera_application::UserRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{EmailAddress, User, UserId, Username};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    display_name: Option<String>,
    email: String,
    password_hash: String,
    legacy_role: Option<String>,
    active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    created_by: Option<uuid::Uuid>,
    updated_by: Option<uuid::Uuid>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            username: Username::new(row.username)?,
            display_name: row.display_name,
            email: EmailAddress::new(row.email)?,
            password_hash: row.password_hash,
            legacy_role: row.legacy_role,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by.map(UserId::from_uuid),
            updated_by: row.updated_by.map(UserId::from_uuid),
        })
    }
}

const USER_COLUMNS: &str = "id, username, display_name, email, password_hash, legacy_role, \
                            active, created_at, updated_at, created_by, updated_by";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, display_name, email, password_hash, legacy_role,
                 active, created_at, updated_at, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.username.as_str())
        .bind(user.display_name.as_deref())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.legacy_role.as_deref())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.created_by.map(|id| id.as_uuid()))
        .bind(user.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("username or email is already taken".to_owned())
            }
            other => AppError::Internal(format!("failed to create user: {other}")),
        })?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET display_name = $2,
                email = $3,
                password_hash = $4,
                legacy_role = $5,
                active = $6,
                updated_at = $7,
                updated_by = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.display_name.as_deref())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.legacy_role.as_deref())
        .bind(user.active)
        .bind(user.updated_at)
        .bind(user.updated_by.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("email is already taken".to_owned())
            }
            other => AppError::Internal(format!("failed to update user: {other}")),
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        // Uniqueness is enforced among active rows only, so a deactivated
        // user may share its login with an active successor. The active row
        // must win.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username = $1 OR email = LOWER($1) \
             ORDER BY active DESC LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to update password hash: {error}"))
            })?;

        Ok(())
    }

    async fn exists(&self, id: UserId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check user: {error}")))?;

        Ok(exists)
    }
}
