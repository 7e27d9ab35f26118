use service_core::{
    axum::{
        extract::{FromRequestParts, Request, State},
        http::request::Parts,
        middleware::Next,
        response::Response,
    },
    error::AppError,
};
use std::sync::Arc;

use crate::{
    authz::{authorize_request, AccessPolicy, Admitted, AuthzError},
    services::SessionClaims,
    AppState,
};

/// Middleware state: the application plus the policy of the routes it guards.
#[derive(Clone)]
pub struct RouteGuard {
    state: AppState,
    policy: Arc<AccessPolicy>,
}

impl RouteGuard {
    pub fn new(state: AppState, policy: AccessPolicy) -> Self {
        Self {
            state,
            policy: Arc::new(policy),
        }
    }
}

/// Middleware running the authorization pipeline for the guarded routes.
///
/// On success the [`Admitted`] value is stored in the request extensions for
/// [`AuthUser`].
pub async fn authorize(
    State(guard): State<RouteGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthzError> {
    let admitted = authorize_request(
        &guard.policy,
        req.headers(),
        &guard.state.jwt,
        guard.state.roles.as_ref(),
        guard.state.config.store.timeout(),
    )
    .await?;

    req.extensions_mut().insert(admitted);

    Ok(next.run(req).await)
}

/// Extractor to easily get claims in handlers
pub struct AuthUser(pub SessionClaims);

#[service_core::axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admitted = parts.extensions.get::<Admitted>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(admitted.claims().clone()))
    }
}
