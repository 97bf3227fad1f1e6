//! Permission catalog management.
//!
//! A permission's name is its contract: the string stored here is exactly
//! what ends up in `perm` claims and what `Perm:`-convention policies demand.
//! Renaming a permission silently strips it from every already-issued token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tessera_core::{AppError, AppResult, AuthenticatedUser};
use tessera_domain::{AuditAction, Permission, PermissionId, PermissionName, UserId};

use crate::audit::{AuditEvent, AuditRepository};

/// Port for the permission table.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Persists a new permission record.
    async fn create(&self, permission: &Permission) -> AppResult<()>;

    /// Persists changes to an existing permission record.
    async fn update(&self, permission: &Permission) -> AppResult<()>;

    /// Finds a permission by identifier.
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    /// Lists all permissions ordered by name.
    async fn list(&self) -> AppResult<Vec<Permission>>;

    /// Returns the subset of the given ids that name existing permissions.
    async fn filter_existing(&self, ids: &[PermissionId]) -> AppResult<Vec<PermissionId>>;
}

/// Input for creating or updating a permission.
#[derive(Debug, Clone)]
pub struct SavePermissionInput {
    /// Permission name, unique among active permissions.
    pub name: String,
    /// Optional operator-facing description.
    pub description: Option<String>,
    /// Activation state; defaults to active on create.
    pub active: Option<bool>,
}

/// Application service for the permission catalog.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn PermissionRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl PermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Lists all permissions.
    pub async fn list(&self) -> AppResult<Vec<Permission>> {
        self.repository.list().await
    }

    /// Fetches one permission by identifier.
    pub async fn get(&self, id: PermissionId) -> AppResult<Permission> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{id}' was not found")))
    }

    /// Creates a permission. Active permissions must have distinct names.
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        input: SavePermissionInput,
    ) -> AppResult<Permission> {
        let name = PermissionName::new(input.name)?;
        self.ensure_name_free(&name, None).await?;

        let actor_id = UserId::from_uuid(actor.user_id());
        let now = Utc::now();
        let permission = Permission {
            id: PermissionId::new(),
            name,
            description: normalize_optional(input.description),
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: Some(actor_id),
            updated_by: Some(actor_id),
        };

        self.repository.create(&permission).await?;
        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::PermissionCreated,
                actor_id: Some(actor_id),
                detail: format!("created permission '{}'", permission.name),
            })
            .await?;

        Ok(permission)
    }

    /// Updates a permission's name, description or activation state.
    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: PermissionId,
        input: SavePermissionInput,
    ) -> AppResult<Permission> {
        let mut permission = self.get(id).await?;

        let name = PermissionName::new(input.name)?;
        if name != permission.name {
            self.ensure_name_free(&name, Some(id)).await?;
        }

        let actor_id = UserId::from_uuid(actor.user_id());
        permission.name = name;
        permission.description = normalize_optional(input.description);
        if let Some(active) = input.active {
            permission.active = active;
        }
        permission.updated_at = Utc::now();
        permission.updated_by = Some(actor_id);

        self.repository.update(&permission).await?;
        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::PermissionUpdated,
                actor_id: Some(actor_id),
                detail: format!("updated permission '{}'", permission.name),
            })
            .await?;

        Ok(permission)
    }

    /// Soft-deletes a permission. New tokens stop carrying the name on the
    /// next issuance; existing tokens keep their snapshot.
    pub async fn deactivate(&self, actor: &AuthenticatedUser, id: PermissionId) -> AppResult<()> {
        let mut permission = self.get(id).await?;
        if !permission.active {
            return Ok(());
        }

        let actor_id = UserId::from_uuid(actor.user_id());
        permission.active = false;
        permission.updated_at = Utc::now();
        permission.updated_by = Some(actor_id);
        self.repository.update(&permission).await?;

        self.audit_repository
            .append(AuditEvent {
                action: AuditAction::PermissionUpdated,
                actor_id: Some(actor_id),
                detail: format!("deactivated permission '{}'", permission.name),
            })
            .await
    }

    async fn ensure_name_free(
        &self,
        name: &PermissionName,
        except: Option<PermissionId>,
    ) -> AppResult<()> {
        let clash = self.repository.list().await?.into_iter().any(|permission| {
            permission.active && permission.name == *name && Some(permission.id) != except
        });
        if clash {
            return Err(AppError::Conflict(format!(
                "an active permission named '{name}' already exists"
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
