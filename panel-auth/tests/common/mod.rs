//! Shared setup for panel-auth integration tests: a router over an in-memory
//! store seeded with an `admin` and a `viewer` identity.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use panel_auth::{
    build_router,
    config::{
        AuthConfig, Environment, GoogleOAuthConfig, JwtConfig, MongoConfig, SecurityConfig,
        StoreConfig,
    },
    models::{Role, User},
    services::{
        GoogleIdentityProvider, GoogleProfile, InMemoryStore, JwtService, MockGoogleProvider,
        RoleStore, UserStore,
    },
    utils::{hash_password, Password},
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const VIEWER_PASSWORD: &str = "viewer-pass-123";
pub const FRONTEND_URL: &str = "http://localhost:3000";

pub const PERMISSION_CATALOG: [&str; 7] = [
    "user:read",
    "user:create",
    "role:create",
    "role:read",
    "role:update",
    "role:delete",
    "permission:read",
];

pub fn test_config(with_google: bool) -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config { port: 3033 },
        environment: Environment::Dev,
        service_name: "panel-auth".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "panel_auth_test".to_string(),
        },
        jwt: JwtConfig {
            secret: Some(TEST_SECRET.to_string()),
            expiry_hours: 24,
        },
        store: StoreConfig { timeout_seconds: 5 },
        google: with_google.then(|| GoogleOAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost:3033/api/auth/google/callback".to_string(),
            frontend_url: FRONTEND_URL.to_string(),
            default_role: "viewer".to_string(),
        }),
        security: SecurityConfig {
            allowed_origins: vec![FRONTEND_URL.to_string()],
        },
    }
}

pub fn verified_profile(email: &str) -> GoogleProfile {
    GoogleProfile {
        id: "google-123".to_string(),
        email: email.to_string(),
        verified_email: true,
        name: Some("Grace Hopper".to_string()),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub jwt: JwtService,
    pub admin_role: Role,
    pub viewer_role: Role,
    pub admin: User,
    pub viewer: User,
}

impl TestApp {
    /// Google sign-in answers with a verified `grace@example.com` profile.
    pub async fn spawn() -> Self {
        Self::build(test_config(true), Some(verified_profile("grace@example.com"))).await
    }

    pub async fn with_google_profile(profile: Option<GoogleProfile>) -> Self {
        Self::build(test_config(true), profile).await
    }

    pub async fn without_google() -> Self {
        Self::build(test_config(false), None).await
    }

    async fn build(config: AuthConfig, profile: Option<GoogleProfile>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store
            .set_permissions(PERMISSION_CATALOG)
            .expect("seed permission catalog");

        let mut admin_role = Role::new(
            "admin".to_string(),
            "Full access".to_string(),
            vec!["*".to_string()],
            None,
        );
        admin_role.is_default = true;
        let viewer_role = Role::new(
            "viewer".to_string(),
            "Read only".to_string(),
            vec!["user:read".to_string()],
            None,
        );
        store.insert_role(&admin_role).await.expect("seed admin role");
        store.insert_role(&viewer_role).await.expect("seed viewer role");

        let admin = local_user("root", "root@example.com", ADMIN_PASSWORD, admin_role.id);
        let viewer = local_user("vera", "vera@example.com", VIEWER_PASSWORD, viewer_role.id);
        store.insert_user(&admin).await.expect("seed admin");
        store.insert_user(&viewer).await.expect("seed viewer");

        let google: Option<Arc<dyn GoogleIdentityProvider>> = if config.google.is_some() {
            Some(Arc::new(MockGoogleProvider::new(profile)))
        } else {
            None
        };

        let jwt = JwtService::new(&config.jwt);
        let state = AppState::new(config, store.clone(), store.clone(), google);

        Self {
            router: build_router(state),
            store,
            jwt,
            admin_role,
            viewer_role,
            admin,
            viewer,
        }
    }

    pub fn token_for(&self, user: &User, role: &Role) -> String {
        self.jwt
            .issue(&user.username, &role.name, &user.id.to_hex())
            .expect("issue token")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&self.admin, &self.admin_role)
    }

    pub fn viewer_token(&self) -> String {
        self.token_for(&self.viewer, &self.viewer_role)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// JSON request with an optional bearer token; returns status and body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub fn local_user(username: &str, email: &str, password: &str, role_id: mongodb::bson::oid::ObjectId) -> User {
    let hash = hash_password(&Password::new(password.to_string())).expect("hash password");
    User::new_local(
        username.to_string(),
        email.to_string(),
        hash.into_string(),
        role_id,
        None,
    )
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    }
}
