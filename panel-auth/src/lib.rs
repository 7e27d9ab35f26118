pub mod authz;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::authz::AccessPolicy;
use crate::config::AuthConfig;
use crate::middleware::{authorize, RouteGuard};
use crate::services::{
    bounded, AuthService, GoogleIdentityProvider, JwtService, RoleStore, UserStore,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub jwt: JwtService,
    pub roles: Arc<dyn RoleStore>,
    pub users: Arc<dyn UserStore>,
    pub auth_service: AuthService,
    /// `None` when Google sign-in is not configured.
    pub google: Option<Arc<dyn GoogleIdentityProvider>>,
}

impl AppState {
    pub fn new(
        config: AuthConfig,
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
        google: Option<Arc<dyn GoogleIdentityProvider>>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let auth_service = AuthService::new(
            users.clone(),
            roles.clone(),
            jwt.clone(),
            config.store.timeout(),
        );
        Self {
            config,
            jwt,
            roles,
            users,
            auth_service,
            google,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let guard =
        |policy: AccessPolicy| from_fn_with_state(RouteGuard::new(state.clone(), policy), authorize);

    // Any valid session
    let session_routes = Router::new()
        .route("/api/profile", get(handlers::get_profile))
        .route("/api/change-password", post(handlers::change_password))
        .route("/api/logout", post(handlers::logout))
        .route_layer(guard(AccessPolicy::authenticated()));

    // Admin role plus one permission per method
    let admin_routes = Router::new()
        .route(
            "/api/admin/users",
            post(handlers::admin_create_user.layer(guard(AccessPolicy::admin("user:create")))),
        )
        .route(
            "/api/admin/roles",
            post(handlers::create_role.layer(guard(AccessPolicy::admin("role:create"))))
                .get(handlers::list_roles.layer(guard(AccessPolicy::admin("role:read")))),
        )
        .route(
            "/api/admin/roles/:id",
            get(handlers::get_role.layer(guard(AccessPolicy::admin("role:read"))))
                .put(handlers::update_role.layer(guard(AccessPolicy::admin("role:update"))))
                .delete(handlers::delete_role.layer(guard(AccessPolicy::admin("role:delete")))),
        )
        .route(
            "/api/admin/roles/:id/status",
            patch(handlers::toggle_role_status.layer(guard(AccessPolicy::admin("role:update")))),
        )
        .route(
            "/api/admin/permissions",
            get(handlers::list_permissions.layer(guard(AccessPolicy::admin("permission:read")))),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/google/login", get(handlers::google_login))
        .route("/api/auth/google/callback", get(handlers::google_callback))
        .merge(session_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Admin panel auth API",
        "version": state.config.service_version,
    }))
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    bounded(state.config.store.timeout(), state.roles.health_check())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Store health check failed");
            AppError::from(e)
        })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
