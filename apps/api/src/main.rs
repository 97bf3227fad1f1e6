//! Tessera API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tessera_application::{
    AssignmentService, AuditLogService, AuthService, PermissionService, PolicyRequirement,
    PolicyResolver, RevocationService, RoleService, TokenCodec, UserAdminService,
};
use tessera_core::AppError;
use tessera_infrastructure::{
    Argon2PasswordHasher, PostgresAssignmentRepository, PostgresAuditRepository,
    PostgresPermissionRepository, PostgresRevocationRepository, PostgresRoleRepository,
    PostgresUserRepository,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api_config::ApiConfig;
use crate::api_router::api_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let config = ApiConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let token_codec = TokenCodec::new(config.jwt.clone())?;

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let permission_repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let assignment_repository = Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let revocation_repository = Arc::new(PostgresRevocationRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());

    let auth_service = AuthService::new(
        user_repository.clone(),
        assignment_repository.clone(),
        password_hasher.clone(),
        audit_repository.clone(),
        token_codec.clone(),
    );
    let user_admin_service = UserAdminService::new(
        user_repository.clone(),
        password_hasher,
        audit_repository.clone(),
    );
    let role_service = RoleService::new(role_repository.clone(), audit_repository.clone());
    let permission_service =
        PermissionService::new(permission_repository.clone(), audit_repository.clone());
    let assignment_service = AssignmentService::new(
        assignment_repository,
        role_repository,
        permission_repository,
        user_repository,
        audit_repository.clone(),
    );
    let revocation_service = RevocationService::new(revocation_repository, audit_repository.clone());
    let audit_log_service = AuditLogService::new(audit_repository);

    // Statically named policies; everything else resolves by the Perm:
    // convention.
    let policy_resolver = Arc::new(
        PolicyResolver::new().with_static_policy("SelfService", PolicyRequirement::Authenticated),
    );

    let app_state = AppState {
        auth_service,
        user_admin_service,
        role_service,
        permission_service,
        assignment_service,
        revocation_service,
        audit_log_service,
        token_codec,
        policy_resolver,
    };

    let app = api_router(app_state);

    let host = IpAddr::from_str(&config.api_host).map_err(|error| {
        AppError::Internal(format!("invalid API_HOST '{}': {error}", config.api_host))
    })?;
    let address = SocketAddr::from((host, config.api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tessera-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
