//! Authentication: credential verification and access-token issuance.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, User, UserId, validate_password};

use crate::assignment_service::AssignmentRepository;
use crate::audit::{AuditEvent, AuditRepository};
use crate::token_issuer::TokenCodec;
use crate::user_admin_service::UserRepository;

/// Role name granted when a user has neither role links nor a legacy role.
pub const DEFAULT_ROLE_NAME: &str = "User";

/// Port for password hashing and verification.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password into a PHC string.
    async fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored PHC string.
    async fn verify_password(&self, password: &str, password_hash: &str) -> AppResult<bool>;
}

/// A successful login result handed back to the client.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact serialized access token.
    pub token: String,
    /// Authenticated username, echoed for client convenience.
    pub username: String,
    /// Effective role names embedded in the token.
    pub roles: Vec<String>,
}

/// Application service for login, logout support and password changes.
#[derive(Clone)]
pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    audit_repository: Arc<dyn AuditRepository>,
    token_codec: TokenCodec,
}

impl AuthService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        audit_repository: Arc<dyn AuditRepository>,
        token_codec: TokenCodec,
    ) -> Self {
        Self {
            user_repository,
            assignment_repository,
            password_hasher,
            audit_repository,
            token_codec,
        }
    }

    /// Authenticates a login/password pair and mints an access token.
    ///
    /// Unknown logins, wrong passwords and deactivated accounts all surface
    /// the same generic unauthorized error. The minted token snapshots the
    /// user's effective roles and permissions as of this moment; later store
    /// changes do not affect it.
    pub async fn login(&self, login: &str, password: &str) -> AppResult<IssuedToken> {
        let Some(user) = self.user_repository.find_by_login(login.trim()).await? else {
            // Equalize timing with the verification path for unknown logins.
            let _ = self.password_hasher.hash_password(password).await;
            self.record_login_failure(login, "unknown login").await?;
            return Err(invalid_credentials());
        };

        let verified = self
            .password_hasher
            .verify_password(password, &user.password_hash)
            .await?;
        if !verified {
            self.record_login_failure(login, "wrong password").await?;
            return Err(invalid_credentials());
        }

        if !user.active {
            self.audit_repository
                .append(AuditEvent {
                    action: AuditAction::LoginBlocked,
                    actor_id: Some(user.id),
                    detail: format!("login blocked for deactivated user '{}'", user.username),
                })
                .await?;
            return Err(invalid_credentials());
        }

        let issued = self.issue_token(&user).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::LoginSucceeded,
                actor_id: Some(user.id),
                detail: format!("user '{}' logged in", user.username),
            })
            .await?;

        Ok(issued)
    }

    /// Changes the caller's own password after re-verifying the current one.
    ///
    /// The already-issued token stays valid; a password change does not touch
    /// the revocation ledger.
    pub async fn change_password(
        &self,
        caller: &AuthenticatedUser,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        validate_password(new_password)?;

        let user_id = UserId::from_uuid(caller.user_id());
        let Some(user) = self.user_repository.find_by_id(user_id).await? else {
            return Err(invalid_credentials());
        };

        let verified = self
            .password_hasher
            .verify_password(current_password, &user.password_hash)
            .await?;
        if !verified {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_owned(),
            ));
        }

        let new_hash = self.password_hasher.hash_password(new_password).await?;
        self.user_repository
            .set_password_hash(user_id, &new_hash)
            .await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::PasswordChanged,
                actor_id: Some(user_id),
                detail: format!("user '{}' changed their password", user.username),
            })
            .await
    }

    /// Returns the configured token lifetime, for expiry bookkeeping.
    #[must_use]
    pub fn token_lifetime(&self) -> chrono::Duration {
        self.token_codec.lifetime()
    }

    async fn issue_token(&self, user: &User) -> AppResult<IssuedToken> {
        let roles = self.effective_roles(user).await?;
        let permissions = self.effective_permissions(user.id).await?;

        let minted = self
            .token_codec
            .mint(user.id.as_uuid(), user.username.as_str(), &roles, &permissions)?;

        Ok(IssuedToken {
            token: minted.token,
            username: user.username.as_str().to_owned(),
            roles,
        })
    }

    /// Effective role names: linked roles first, then the legacy single-role
    /// field, then the default role. The fallbacks keep accounts predating
    /// role links authenticating with a non-empty role set.
    async fn effective_roles(&self, user: &User) -> AppResult<Vec<String>> {
        let linked: BTreeSet<String> = self
            .assignment_repository
            .role_names_for_user(user.id)
            .await?
            .into_iter()
            .collect();

        if !linked.is_empty() {
            return Ok(linked.into_iter().collect());
        }

        if let Some(legacy) = user.legacy_role.as_deref()
            && !legacy.trim().is_empty()
        {
            return Ok(vec![legacy.trim().to_owned()]);
        }

        Ok(vec![DEFAULT_ROLE_NAME.to_owned()])
    }

    /// Effective permission names: the union across all linked roles, each
    /// name at most once.
    async fn effective_permissions(&self, user_id: UserId) -> AppResult<Vec<String>> {
        let union: BTreeSet<String> = self
            .assignment_repository
            .permission_names_for_user(user_id)
            .await?
            .into_iter()
            .collect();

        Ok(union.into_iter().collect())
    }

    async fn record_login_failure(&self, login: &str, reason: &str) -> AppResult<()> {
        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::LoginFailed,
                actor_id: None,
                detail: format!("login failed for '{}': {reason}", login.trim()),
            })
            .await
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid credentials".to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tessera_core::{AppError, AppResult, AuthenticatedUser};
    use tessera_domain::{
        AuditAction, EmailAddress, Permission, PermissionId, Role, RoleId, User, UserId, Username,
    };
    use tokio::sync::Mutex;

    use crate::assignment_service::{AssignmentRepository, ReplaceOutcome};
    use crate::audit::{AuditEvent, AuditRepository};
    use crate::token_issuer::{JwtConfig, TokenCodec};
    use crate::user_admin_service::UserRepository;

    use super::{AuthService, PasswordHasher};

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
    struct FakeAssignments {
        roles: Mutex<HashMap<UserId, Vec<String>>>,
        permissions: Mutex<HashMap<UserId, Vec<String>>>,
    }

    #[async_trait]
    impl AssignmentRepository for FakeAssignments {
        async fn permissions_for_role(&self, _role_id: RoleId) -> AppResult<Vec<Permission>> {
            Ok(Vec::new())
        }

        async fn roles_for_user(&self, _user_id: UserId) -> AppResult<Vec<Role>> {
            Ok(Vec::new())
        }

        async fn role_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>> {
            Ok(self
                .roles
                .lock()
                .await
                .get(&user_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn permission_names_for_user(&self, user_id: UserId) -> AppResult<Vec<String>> {
            Ok(self
                .permissions
                .lock()
                .await
                .get(&user_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn replace_role_permissions(
            &self,
            _role_id: RoleId,
            _permission_ids: &[PermissionId],
        ) -> AppResult<ReplaceOutcome> {
            Ok(ReplaceOutcome {
                removed: 0,
                inserted: 0,
            })
        }

        async fn replace_user_roles(
            &self,
            _user_id: UserId,
            _role_ids: &[RoleId],
        ) -> AppResult<ReplaceOutcome> {
            Ok(ReplaceOutcome {
                removed: 0,
                inserted: 0,
            })
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

    fn user(username: &str, password: &str, legacy_role: Option<&str>) -> AppResult<User> {
        Ok(User {
            id: UserId::new(),
            username: Username::new(username)?,
            display_name: None,
            email: EmailAddress::new(format!("{username}@example.com"))?,
            password_hash: format!("hashed:{password}"),
            legacy_role: legacy_role.map(ToOwned::to_owned),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            updated_by: None,
        })
    }

    struct Harness {
        users: Arc<FakeUserRepository>,
        assignments: Arc<FakeAssignments>,
        audit: Arc<FakeAuditRepository>,
        codec: TokenCodec,
        service: AuthService,
    }

    fn harness() -> AppResult<Harness> {
        let users = Arc::new(FakeUserRepository::default());
        let assignments = Arc::new(FakeAssignments::default());
        let audit = Arc::new(FakeAuditRepository::default());
        let codec = TokenCodec::new(JwtConfig::new("0123456789abcdef0123456789abcdef"))?;
        let service = AuthService::new(
            users.clone(),
            assignments.clone(),
            Arc::new(FakeHasher),
            audit.clone(),
            codec.clone(),
        );
        Ok(Harness {
            users,
            assignments,
            audit,
            codec,
            service,
        })
    }

    #[tokio::test]
    async fn login_mints_a_token_with_linked_roles_and_permissions() -> AppResult<()> {
        let harness = harness()?;
        let alice = user("alice", "s3cret-pw", Some("Viewer"))?;
        let alice_id = alice.id;
        harness.users.users.lock().await.push(alice);
        harness.assignments.roles.lock().await.insert(
            alice_id,
            vec!["Admin".to_owned(), "Ops".to_owned()],
        );
        harness.assignments.permissions.lock().await.insert(
            alice_id,
            vec![
                "Users.Read".to_owned(),
                "Users.Update".to_owned(),
                "Users.Read".to_owned(),
            ],
        );

        let issued = harness.service.login("alice", "s3cret-pw").await?;
        assert_eq!(issued.username, "alice");
        assert_eq!(issued.roles, vec!["Admin".to_owned(), "Ops".to_owned()]);

        let claims = harness.codec.verify(&issued.token)?;
        assert_eq!(claims.role, vec!["Admin".to_owned(), "Ops".to_owned()]);
        // Union: the duplicate permission appears once.
        assert_eq!(
            claims.perm,
            vec!["Users.Read".to_owned(), "Users.Update".to_owned()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn legacy_role_applies_only_without_role_links() -> AppResult<()> {
        let harness = harness()?;
        harness
            .users
            .users
            .lock()
            .await
            .push(user("bruno", "s3cret-pw", Some("Manager"))?);

        let issued = harness.service.login("bruno", "s3cret-pw").await?;
        assert_eq!(issued.roles, vec!["Manager".to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn default_role_covers_users_with_no_role_information() -> AppResult<()> {
        let harness = harness()?;
        harness
            .users
            .users
            .lock()
            .await
            .push(user("carol", "s3cret-pw", None)?);

        let issued = harness.service.login("carol", "s3cret-pw").await?;
        assert_eq!(issued.roles, vec!["User".to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_login_fail_identically() -> AppResult<()> {
        let harness = harness()?;
        harness
            .users
            .users
            .lock()
            .await
            .push(user("alice", "s3cret-pw", None)?);

        let wrong = harness.service.login("alice", "not-it").await;
        let unknown = harness.service.login("nobody", "not-it").await;

        let messages: Vec<String> = [wrong, unknown]
            .into_iter()
            .map(|result| match result {
                Err(AppError::Unauthorized(message)) => message,
                other => panic!("expected unauthorized, got {other:?}"),
            })
            .collect();
        assert_eq!(messages[0], messages[1]);
        Ok(())
    }

    #[tokio::test]
    async fn deactivated_users_cannot_log_in() -> AppResult<()> {
        let harness = harness()?;
        let mut dora = user("dora", "s3cret-pw", None)?;
        dora.active = false;
        harness.users.users.lock().await.push(dora);

        let result = harness.service.login("dora", "s3cret-pw").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let events = harness.audit.events.lock().await;
        assert!(events
            .iter()
            .any(|event| event.action == AuditAction::LoginBlocked));
        Ok(())
    }

    #[tokio::test]
    async fn login_resolves_to_the_active_user_over_a_deactivated_namesake() -> AppResult<()> {
        let harness = harness()?;
        let mut retired = user("bruno", "old-pw", None)?;
        retired.active = false;
        let successor = user("bruno", "new-pw", None)?;
        let successor_id = successor.id;
        // The retired row is stored first; lookup order must not matter.
        harness.users.users.lock().await.push(retired);
        harness.users.users.lock().await.push(successor);

        let issued = harness.service.login("bruno", "new-pw").await?;
        let claims = harness.codec.verify(&issued.token)?;
        assert_eq!(claims.sub, successor_id.as_uuid().to_string());
        Ok(())
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() -> AppResult<()> {
        let harness = harness()?;
        let eve = user("eve", "old-secret", None)?;
        let eve_id = eve.id;
        harness.users.users.lock().await.push(eve);

        let caller = AuthenticatedUser::new(
            eve_id.as_uuid(),
            "eve",
            Some("jti-1".to_owned()),
            vec!["User".to_owned()],
            Vec::new(),
        );

        let denied = harness
            .service
            .change_password(&caller, "wrong-old", "brand-new-pw")
            .await;
        assert!(matches!(denied, Err(AppError::Unauthorized(_))));

        harness
            .service
            .change_password(&caller, "old-secret", "brand-new-pw")
            .await?;

        let issued = harness.service.login("eve", "brand-new-pw").await?;
        assert_eq!(issued.username, "eve");
        Ok(())
    }

    #[tokio::test]
    async fn short_new_passwords_are_rejected() -> AppResult<()> {
        let harness = harness()?;
        let caller = AuthenticatedUser::new(
            UserId::new().as_uuid(),
            "ghost",
            None,
            Vec::new(),
            Vec::new(),
        );

        let result = harness.service.change_password(&caller, "x", "tiny").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn token_snapshot_ignores_later_assignment_changes() -> AppResult<()> {
        let harness = harness()?;
        let frank = user("frank", "s3cret-pw", None)?;
        let frank_id = frank.id;
        harness.users.users.lock().await.push(frank);
        harness
            .assignments
            .permissions
            .lock()
            .await
            .insert(frank_id, vec!["Reports.Read".to_owned()]);

        let issued = harness.service.login("frank", "s3cret-pw").await?;

        // Assignments change after issuance; the already-minted token keeps
        // its snapshot.
        harness.assignments.permissions.lock().await.clear();

        let claims = harness.codec.verify(&issued.token)?;
        assert_eq!(claims.perm, vec!["Reports.Read".to_owned()]);
        Ok(())
    }
}
