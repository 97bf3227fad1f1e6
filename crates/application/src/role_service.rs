//! Role catalog management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, Role, RoleId, RoleName, UserId};

use crate::audit::{AuditEvent, AuditRepository};

/// Port for the role table.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a new role record.
    async fn create(&self, role: &Role) -> AppResult<()>;

    /// Persists changes to an existing role record.
    async fn update(&self, role: &Role) -> AppResult<()>;

    /// Finds a role by identifier.
    async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>>;

    /// Lists all roles ordered by name.
    async fn list(&self) -> AppResult<Vec<Role>>;

    /// Returns whether a role record exists.
    async fn exists(&self, id: RoleId) -> AppResult<bool>;

    /// Returns the subset of the given ids that name existing roles.
    async fn filter_existing(&self, ids: &[RoleId]) -> AppResult<Vec<RoleId>>;
}

/// Input for creating or updating a role.
#[derive(Debug, Clone)]
pub struct SaveRoleInput {
    /// Role name, unique among active roles.
    pub name: String,
    /// Optional operator-facing description.
    pub description: Option<String>,
    /// Activation state; defaults to active on create.
    pub active: Option<bool>,
}

/// Application service for the role catalog.
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Lists all roles.
    pub async fn list(&self) -> AppResult<Vec<Role>> {
        self.repository.list().await
    }

    /// Fetches one role by identifier.
    pub async fn get(&self, id: RoleId) -> AppResult<Role> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{id}' was not found")))
    }

    /// Creates a role. Active roles must have distinct names.
    pub async fn create(&self, actor: &AuthenticatedUser, input: SaveRoleInput) -> AppResult<Role> {
        let name = RoleName::new(input.name)?;
        self.ensure_name_free(&name, None).await?;

        let actor_id = UserId::from_uuid(actor.user_id());
        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            name,
            description: normalize_optional(input.description),
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: Some(actor_id),
            updated_by: Some(actor_id),
        };

        self.repository.create(&role).await?;
        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::RoleCreated,
                actor_id: Some(actor_id),
                detail: format!("created role '{}'", role.name),
            })
            .await?;

        Ok(role)
    }

    /// Updates a role's name, description or activation state.
    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: RoleId,
        input: SaveRoleInput,
    ) -> AppResult<Role> {
        let mut role = self.get(id).await?;

        let name = RoleName::new(input.name)?;
        if name != role.name {
            self.ensure_name_free(&name, Some(id)).await?;
        }

        let actor_id = UserId::from_uuid(actor.user_id());
        role.name = name;
        role.description = normalize_optional(input.description);
        if let Some(active) = input.active {
            role.active = active;
        }
        role.updated_at = Utc::now();
        role.updated_by = Some(actor_id);

        self.repository.update(&role).await?;
        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::RoleUpdated,
                actor_id: Some(actor_id),
                detail: format!("updated role '{}'", role.name),
            })
            .await?;

        Ok(role)
    }

    /// Soft-deletes a role. Junction rows stay in place; tokens already
    /// carrying the role keep it until they expire.
    pub async fn deactivate(&self, actor: &AuthenticatedUser, id: RoleId) -> AppResult<()> {
        let mut role = self.get(id).await?;
        if !role.active {
            return Ok(());
        }

        let actor_id = UserId::from_uuid(actor.user_id());
        role.active = false;
        role.updated_at = Utc::now();
        role.updated_by = Some(actor_id);
        self.repository.update(&role).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::RoleUpdated,
                actor_id: Some(actor_id),
                detail: format!("deactivated role '{}'", role.name),
            })
            .await
    }

    async fn ensure_name_free(&self, name: &RoleName, except: Option<RoleId>) -> AppResult<()> {
        let clash = self.repository.list().await?.into_iter().any(|role| {
            role.active && role.name == *name && Some(role.id) != except
        });
        if clash {
            return Err(AppError::Conflict(format!(
                "an active role named '{name}' already exists"
            )));
        }
        Ok(())
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
    use tessera_domain::{Role, RoleId};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use crate::audit::{AuditEvent, AuditRepository};

    use super::{RoleRepository, RoleService, SaveRoleInput};

    #[derive(Default)]
    struct FakeRoleRepository {
        roles: Mutex<Vec<Role>>,
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn create(&self, role: &Role) -> AppResult<()> {
            self.roles.lock().await.push(role.clone());
            Ok(())
        }

        async fn update(&self, role: &Role) -> AppResult<()> {
            let mut roles = self.roles.lock().await;
            if let Some(existing) = roles.iter_mut().find(|r| r.id == role.id) {
                *existing = role.clone();
            }
            Ok(())
        }

        async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
            Ok(self.roles.lock().await.iter().find(|r| r.id == id).cloned())
        }

        async fn list(&self) -> AppResult<Vec<Role>> {
            Ok(self.roles.lock().await.clone())
        }

        async fn exists(&self, id: RoleId) -> AppResult<bool> {
            Ok(self.roles.lock().await.iter().any(|r| r.id == id))
        }

        async fn filter_existing(&self, ids: &[RoleId]) -> AppResult<Vec<RoleId>> {
            let roles = self.roles.lock().await;
            Ok(ids
                .iter()
                .copied()
                .filter(|id| roles.iter().any(|r| r.id == *id))
                .collect())
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
            None,
            vec!["Admin".to_owned()],
            vec!["Roles.Create".to_owned()],
        )
    }

    fn service() -> RoleService {
        RoleService::new(
            Arc::new(FakeRoleRepository::default()),
            Arc::new(FakeAuditRepository::default()),
        )
    }

    fn input(name: &str) -> SaveRoleInput {
        SaveRoleInput {
            name: name.to_owned(),
            description: None,
            active: None,
        }
    }

    #[tokio::test]
    async fn duplicate_active_names_conflict() -> AppResult<()> {
        let service = service();
        service.create(&actor(), input("Ops")).await?;

        let result = service.create(&actor(), input("Ops")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn an_inactive_role_frees_its_name() -> AppResult<()> {
        let service = service();
        let ops = service.create(&actor(), input("Ops")).await?;
        service
            .update(
                &actor(),
                ops.id,
                SaveRoleInput {
                    name: "Ops".to_owned(),
                    description: None,
                    active: Some(false),
                },
            )
            .await?;

        assert!(service.create(&actor(), input("Ops")).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_the_name_when_unchanged() -> AppResult<()> {
        let service = service();
        let ops = service.create(&actor(), input("Ops")).await?;

        let updated = service
            .update(
                &actor(),
                ops.id,
                SaveRoleInput {
                    name: "Ops".to_owned(),
                    description: Some("  on-call staff ".to_owned()),
                    active: None,
                },
            )
            .await?;
        assert_eq!(updated.description.as_deref(), Some("on-call staff"));
        Ok(())
    }

    #[tokio::test]
    async fn deactivation_is_idempotent_and_frees_the_name() -> AppResult<()> {
        let service = service();
        let ops = service.create(&actor(), input("Ops")).await?;

        service.deactivate(&actor(), ops.id).await?;
        service.deactivate(&actor(), ops.id).await?;

        assert!(!service.get(ops.id).await?.active);
        assert!(service.create(&actor(), input("Ops")).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let service = service();
        let result = service.get(RoleId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
