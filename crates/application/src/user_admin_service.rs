//! Administrative user management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, EmailAddress, User, UserId, Username, validate_password};

use crate::audit::{AuditEvent, AuditRepository};
use crate::auth_service::PasswordHasher;

/// Port for the user table.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user record.
    async fn create(&self, user: &User) -> AppResult<()>;

    /// Persists changes to an existing user record.
    async fn update(&self, user: &User) -> AppResult<()>;

    /// Finds a user by identifier.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Finds a user by username or email address. Deactivated rows may share
    /// a login with an active one; implementations return the active row in
    /// that case.
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>>;

    /// Lists all users, newest first.
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Overwrites a user's stored password hash.
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()>;

    /// Returns whether a user record exists.
    async fn exists(&self, id: UserId) -> AppResult<bool>;
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Login name.
    pub username: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Email address.
    pub email: String,
    /// Initial plaintext password.
    pub password: String,
    /// Optional legacy single-role value.
    pub legacy_role: Option<String>,
}

/// Input for updating a user. Absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    /// New display name; `Some(None)` clears it.
    pub display_name: Option<Option<String>>,
    /// New email address.
    pub email: Option<String>,
    /// New legacy single-role value; `Some(None)` clears it.
    pub legacy_role: Option<Option<String>>,
    /// New activation state.
    pub active: Option<bool>,
    /// New plaintext password.
    pub password: Option<String>,
}

/// Application service for user administration.
#[derive(Clone)]
pub struct UserAdminService {
    repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl UserAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            audit_repository,
        }
    }

    /// Lists all users.
    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.list().await
    }

    /// Fetches one user by identifier.
    pub async fn get(&self, id: UserId) -> AppResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{id}' was not found")))
    }

    /// Creates a user with a hashed initial password.
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        input: CreateUserInput,
    ) -> AppResult<User> {
        let username = Username::new(input.username)?;
        let email = EmailAddress::new(input.email)?;
        validate_password(&input.password)?;

        // Only active holders block reuse; a deactivated user's login is free.
        if self
            .repository
            .find_by_login(username.as_str())
            .await?
            .is_some_and(|existing| existing.active)
        {
            return Err(AppError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }
        if self
            .repository
            .find_by_login(email.as_str())
            .await?
            .is_some_and(|existing| existing.active)
        {
            return Err(AppError::Conflict(format!(
                "email '{}' is already taken",
                email.as_str()
            )));
        }

        let password_hash = self.password_hasher.hash_password(&input.password).await?;
        let actor_id = UserId::from_uuid(actor.user_id());
        let now = Utc::now();

        let user = User {
            id: UserId::new(),
            username,
            display_name: normalize_optional(input.display_name),
            email,
            password_hash,
            legacy_role: normalize_optional(input.legacy_role),
            active: true,
            created_at: now,
            updated_at: now,
            created_by: Some(actor_id),
            updated_by: Some(actor_id),
        };

        self.repository.create(&user).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::UserCreated,
                actor_id: Some(actor_id),
                detail: format!("created user '{}'", user.username),
            })
            .await?;

        Ok(user)
    }

    /// Applies a partial update to a user.
    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: UserId,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        let mut user = self.get(id).await?;
        let actor_id = UserId::from_uuid(actor.user_id());
        let deactivating = input.active == Some(false) && user.active;

        if let Some(display_name) = input.display_name {
            user.display_name = normalize_optional(display_name);
        }
        if let Some(email) = input.email {
            let email = EmailAddress::new(email)?;
            if email != user.email
                && let Some(other) = self.repository.find_by_login(email.as_str()).await?
                && other.id != user.id
                && other.active
            {
                return Err(AppError::Conflict(format!(
                    "email '{}' is already taken",
                    email.as_str()
                )));
            }
            user.email = email;
        }
        if let Some(legacy_role) = input.legacy_role {
            user.legacy_role = normalize_optional(legacy_role);
        }
        if let Some(active) = input.active {
            user.active = active;
        }
        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = self.password_hasher.hash_password(&password).await?;
        }

        user.updated_at = Utc::now();
        user.updated_by = Some(actor_id);
        self.repository.update(&user).await?;

        let action = if deactivating {
            AuditAction::UserDeactivated
        } else {
            AuditAction::UserUpdated
        };
        self.audit_repository
            .append(AuditEvent {
                action,
                actor_id: Some(actor_id),
                detail: format!("updated user '{}'", user.username),
            })
            .await?;

        Ok(user)
    }

    /// Soft-deletes a user. Deactivation frees the username and email for
    /// reuse and blocks future logins; already-issued tokens are untouched.
    pub async fn deactivate(&self, actor: &AuthenticatedUser, id: UserId) -> AppResult<()> {
        let mut user = self.get(id).await?;
        if !user.active {
            return Ok(());
        }

        let actor_id = UserId::from_uuid(actor.user_id());
        user.active = false;
        user.updated_at = Utc::now();
        user.updated_by = Some(actor_id);
        self.repository.update(&user).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::UserDeactivated,
                actor_id: Some(actor_id),
                detail: format!("deactivated user '{}'", user.username),
            })
            .await
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tessera_core::{AppError, AppResult, AuthenticatedUser};
    use tessera_domain::{User, UserId};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use crate::audit::{AuditEvent, AuditRepository};
    use crate::auth_service::PasswordHasher;

    use super::{CreateUserInput, UpdateUserInput, UserAdminService, UserRepository};

    struct FakeHasher;

    #[async_trait]
    impl PasswordHasher for FakeHasher {
        async fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        async fn verify_password(&self, password: &str, password_hash: &str) -> AppResult<bool> {
            Ok(password_hash == format!("hashed:{password}"))
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn create(&self, user: &User) -> AppResult<()> {
            self.users.lock().await.push(user.clone());
            Ok(())
        }

        async fn update(&self, user: &User) -> AppResult<()> {
            let mut users = self.users.lock().await;
            if let Some(existing) = users.iter_mut().find(|u| u.id == user.id) {
                *existing = user.clone();
            }
            Ok(())
        }

        async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
            Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
        }

        async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .filter(|u| u.username.as_str() == login || u.email.as_str() == login)
                .max_by_key(|u| u.active)
                .cloned())
        }

        async fn list(&self) -> AppResult<Vec<User>> {
            Ok(self.users.lock().await.clone())
        }

        async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
            let mut users = self.users.lock().await;
            if let Some(existing) = users.iter_mut().find(|u| u.id == id) {
                existing.password_hash = password_hash.to_owned();
            }
            Ok(())
        }

        async fn exists(&self, id: UserId) -> AppResult<bool> {
            Ok(self.users.lock().await.iter().any(|u| u.id == id))
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

    fn actor() -> AuthenticatedUser {
        AuthenticatedUser::new(
            Uuid::new_v4(),
            "admin",
            Some("jti-actor".to_owned()),
            vec!["Admin".to_owned()],
            vec!["Users.Create".to_owned()],
        )
    }

    fn service() -> (UserAdminService, Arc<FakeUserRepository>) {
        let repository = Arc::new(FakeUserRepository::default());
        let service = UserAdminService::new(
            repository.clone(),
            Arc::new(FakeHasher),
            Arc::new(FakeAuditRepository::default()),
        );
        (service, repository)
    }

    fn input(username: &str, email: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_owned(),
            display_name: Some("  Test User  ".to_owned()),
            email: email.to_owned(),
            password: "s3cret-pw".to_owned(),
            legacy_role: None,
        }
    }

    #[tokio::test]
    async fn create_hashes_the_password_and_trims_the_display_name() -> AppResult<()> {
        let (service, _) = service();

        let user = service
            .create(&actor(), input("alice", "alice@example.com"))
            .await?;
        assert_eq!(user.password_hash, "hashed:s3cret-pw");
        assert_eq!(user.display_name.as_deref(), Some("Test User"));
        assert!(user.active);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_conflicts() -> AppResult<()> {
        let (service, _) = service();
        service
            .create(&actor(), input("alice", "alice@example.com"))
            .await?;

        let same_name = service
            .create(&actor(), input("alice", "other@example.com"))
            .await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let same_email = service
            .create(&actor(), input("alicia", "alice@example.com"))
            .await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_applies_only_provided_fields() -> AppResult<()> {
        let (service, _) = service();
        let created = service
            .create(&actor(), input("bruno", "bruno@example.com"))
            .await?;

        let updated = service
            .update(
                &actor(),
                created.id,
                UpdateUserInput {
                    display_name: Some(None),
                    active: Some(false),
                    ..UpdateUserInput::default()
                },
            )
            .await?;

        assert_eq!(updated.display_name, None);
        assert!(!updated.active);
        assert_eq!(updated.email, created.email);
        Ok(())
    }

    #[tokio::test]
    async fn update_rejects_an_email_already_taken_by_another_user() -> AppResult<()> {
        let (service, _) = service();
        service
            .create(&actor(), input("alice", "alice@example.com"))
            .await?;
        let bruno = service
            .create(&actor(), input("bruno", "bruno@example.com"))
            .await?;

        let result = service
            .update(
                &actor(),
                bruno.id,
                UpdateUserInput {
                    email: Some("alice@example.com".to_owned()),
                    ..UpdateUserInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn deactivation_frees_the_username_and_email_for_reuse() -> AppResult<()> {
        let (service, _) = service();
        let bruno = service
            .create(&actor(), input("bruno", "bruno@example.com"))
            .await?;
        service.deactivate(&actor(), bruno.id).await?;

        let successor = service
            .create(&actor(), input("bruno", "bruno@example.com"))
            .await?;
        assert_ne!(successor.id, bruno.id);
        assert!(successor.active);
        Ok(())
    }

    #[tokio::test]
    async fn deactivation_is_idempotent() -> AppResult<()> {
        let (service, repository) = service();
        let created = service
            .create(&actor(), input("carla", "carla@example.com"))
            .await?;

        service.deactivate(&actor(), created.id).await?;
        service.deactivate(&actor(), created.id).await?;

        let stored = repository.find_by_id(created.id).await?;
        assert!(stored.is_some_and(|u| !u.active));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _) = service();
        let result = service.get(UserId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
