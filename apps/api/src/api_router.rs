//! Route table.

use axum::Router;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Builds the full application router.
pub fn api_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/users",
            get(handlers::users::list_users_handler).post(handlers::users::create_user_handler),
        )
        .route(
            "/api/users/{user_id}",
            get(handlers::users::get_user_handler)
                .put(handlers::users::update_user_handler)
                .delete(handlers::users::deactivate_user_handler),
        )
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/roles/{role_id}",
            get(handlers::roles::get_role_handler)
                .put(handlers::roles::update_role_handler)
                .delete(handlers::roles::deactivate_role_handler),
        )
        .route(
            "/api/permissions",
            get(handlers::permissions::list_permissions_handler)
                .post(handlers::permissions::create_permission_handler),
        )
        .route(
            "/api/permissions/{permission_id}",
            get(handlers::permissions::get_permission_handler)
                .put(handlers::permissions::update_permission_handler)
                .delete(handlers::permissions::deactivate_permission_handler),
        )
        .route(
            "/api/role-permissions/{role_id}",
            get(handlers::assignments::list_role_permissions_handler),
        )
        .route(
            "/api/role-permissions/assign",
            post(handlers::assignments::assign_role_permissions_handler),
        )
        .route(
            "/api/user-roles/{user_id}",
            get(handlers::assignments::list_user_roles_handler),
        )
        .route(
            "/api/user-roles/assign",
            post(handlers::assignments::assign_user_roles_handler),
        )
        .route("/api/logs", get(handlers::logs::list_audit_log_handler))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password_handler),
        )
        .route("/api/auth/logout", post(handlers::auth::logout_handler))
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}
